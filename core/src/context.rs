use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::config::AppConfig;
use crate::logstream::{InMemoryBus, LogBus, LogRelay, RunHistoryCache};
use crate::runner::ProcessController;

/// Process-wide shared state. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    cfg: Arc<AppConfig>,
    relay: LogRelay,
    controller: Arc<ProcessController>,
    tracker: TaskTracker,
}

impl AppContext {
    /// In-process bus, history sized from `cfg.history`.
    pub fn new(cfg: AppConfig) -> Self {
        let bus: Arc<dyn LogBus> = Arc::new(InMemoryBus::new());
        Self::with_bus(cfg, bus)
    }

    pub fn with_bus(cfg: AppConfig, bus: Arc<dyn LogBus>) -> Self {
        let cache = RunHistoryCache::with_limit(cfg.history.max_records_per_run);
        let controller = ProcessController::new(cfg.process.stop_timeout());
        Self {
            relay: LogRelay::new(bus, Arc::new(cache)),
            controller: Arc::new(controller),
            tracker: TaskTracker::new(),
            cfg: Arc::new(cfg),
        }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn relay(&self) -> &LogRelay {
        &self.relay
    }

    pub fn controller(&self) -> Arc<ProcessController> {
        self.controller.clone()
    }

    /// Background work (output relays, exit waiters, remote submissions).
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Waits for every tracked background task. New tasks may not be
    /// spawned afterwards.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!("background tasks drained");
    }
}

use std::sync::Arc;

use crate::error::PublishError;

use super::bus::LogBus;
use super::record::LogRecord;
use super::RunHistoryCache;

pub const SUBJECT_PREFIX: &str = "workflows";

pub fn subject_for(run_name: &str) -> String {
    format!("{}.{}", SUBJECT_PREFIX, run_name)
}

/// Turns raw output lines into records, keeps them in the run history and
/// fans them out on the run's topic.
#[derive(Clone)]
pub struct LogRelay {
    pub(super) bus: Arc<dyn LogBus>,
    pub(super) cache: Arc<RunHistoryCache>,
}

impl LogRelay {
    pub fn new(bus: Arc<dyn LogBus>, cache: Arc<RunHistoryCache>) -> Self {
        Self { bus, cache }
    }

    /// The record is cached before the publish and stays cached when the
    /// publish fails.
    pub fn publish(&self, run_name: &str, message: &str) -> Result<LogRecord, PublishError> {
        let record = LogRecord::new(message);
        self.cache.add(run_name, record.clone());

        let subject = subject_for(run_name);
        let data = serde_json::to_vec(&record).map_err(PublishError::Serialize)?;
        self.bus
            .publish(&subject, data)
            .map_err(|reason| PublishError::Bus { subject, reason })?;

        Ok(record)
    }

    pub fn history(&self, run_name: &str) -> Vec<LogRecord> {
        self.cache.get(run_name)
    }
}

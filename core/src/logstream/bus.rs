use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

/// Serialized message as carried by the bus.
pub type BusPayload = Arc<[u8]>;

/// Publish/subscribe interface of the message broker. The broker's own
/// lifecycle is owned elsewhere; the relay only publishes and subscribes.
pub trait LogBus: Send + Sync {
    fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), String>;

    fn subscribe(&self, subject: &str) -> Result<broadcast::Receiver<BusPayload>, String>;
}

const TOPIC_CAPACITY: usize = 1024;

/// Broker living inside the process: one broadcast channel per subject.
/// Publishing to a subject nobody listens on is not an error.
pub struct InMemoryBus {
    topics: Mutex<HashMap<String, broadcast::Sender<BusPayload>>>,
    closed: AtomicBool,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Drops every topic; later publishes and subscribes fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBus for InMemoryBus {
    fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), String> {
        if self.is_closed() {
            return Err("connection closed".to_string());
        }
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = topics.get(subject) {
            if tx.send(payload.into()).is_err() {
                // every subscriber went away
                topics.remove(subject);
            }
        }
        Ok(())
    }

    fn subscribe(&self, subject: &str) -> Result<broadcast::Receiver<BusPayload>, String> {
        if self.is_closed() {
            return Err("connection closed".to_string());
        }
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = topics
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0);
        Ok(tx.subscribe())
    }
}

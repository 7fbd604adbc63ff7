use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::record::LogRecord;
use super::relay::{subject_for, LogRelay};

/// Capacity of a subscriber's channel; absorbs bursts from chatty runs.
pub const SUBSCRIBER_BUFFER: usize = 1000;

impl LogRelay {
    /// Streams a run's cached backlog followed by its live records.
    ///
    /// The live subscription is opened before the backlog is read, and live
    /// records are held back until the replay is done, so a record published
    /// while the stream is being set up may show up twice but is never lost.
    /// Cancelling `cancel` stops both the replay and the live forwarding.
    pub fn stream(&self, run_name: &str, cancel: CancellationToken) -> mpsc::Receiver<LogRecord> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let subject = subject_for(run_name);

        let live = match self.bus.subscribe(&subject) {
            Ok(live) => live,
            Err(err) => {
                tracing::error!(target: "shard.relay", subject = %subject, error = %err, "subscribe failed");
                let msg = LogRecord::new(&format!("Failed to subscribe to log bus: {}", err));
                tokio::spawn(async move {
                    forward(&tx, msg, &cancel).await;
                });
                return rx;
            }
        };

        let backlog = self.cache.get(run_name);
        let (replayed_tx, replayed_rx) = oneshot::channel::<()>();

        let replay_out = tx.clone();
        let replay_cancel = cancel.clone();
        tokio::spawn(async move {
            for record in backlog {
                if !forward(&replay_out, record, &replay_cancel).await {
                    return;
                }
            }
            let _ = replayed_tx.send(());
        });

        let run = run_name.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                done = replayed_rx => {
                    if done.is_err() {
                        return;
                    }
                }
            }
            forward_live(live, tx, cancel, run).await;
        });

        rx
    }
}

async fn forward_live(
    mut live: broadcast::Receiver<super::BusPayload>,
    tx: mpsc::Sender<LogRecord>,
    cancel: CancellationToken,
    run_name: String,
) {
    loop {
        let payload = tokio::select! {
            _ = cancel.cancelled() => return,
            msg = live.recv() => msg,
        };
        match payload {
            Ok(data) => match serde_json::from_slice::<LogRecord>(&data) {
                Ok(record) => {
                    if !forward(&tx, record, &cancel).await {
                        return;
                    }
                }
                Err(err) => {
                    tracing::error!(target: "shard.relay", run_name = %run_name, error = %err, "Failed to unmarshal log");
                }
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(target: "shard.relay", run_name = %run_name, skipped, "log subscriber lagging, records dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Returns false once the subscriber is gone or cancelled.
async fn forward(tx: &mpsc::Sender<LogRecord>, record: LogRecord, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(record) => sent.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::logstream::{InMemoryBus, RunHistoryCache};

    fn relay() -> (LogRelay, Arc<InMemoryBus>) {
        let bus = Arc::new(InMemoryBus::new());
        (LogRelay::new(bus.clone(), Arc::new(RunHistoryCache::new())), bus)
    }

    async fn next(rx: &mut mpsc::Receiver<LogRecord>) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten()
            .map(|r| r.message)
    }

    #[tokio::test]
    async fn backlog_then_live() {
        let (relay, _bus) = relay();
        relay.publish("run", "one").unwrap();
        relay.publish("run", "two").unwrap();

        let mut rx = relay.stream("run", CancellationToken::new());
        assert_eq!(next(&mut rx).await.as_deref(), Some("one"));
        assert_eq!(next(&mut rx).await.as_deref(), Some("two"));

        relay.publish("run", "three").unwrap();
        assert_eq!(next(&mut rx).await.as_deref(), Some("three"));
    }

    #[tokio::test]
    async fn other_runs_are_not_delivered() {
        let (relay, _bus) = relay();
        let mut rx = relay.stream("mine", CancellationToken::new());
        relay.publish("theirs", "nope").unwrap();
        relay.publish("mine", "yes").unwrap();
        assert_eq!(next(&mut rx).await.as_deref(), Some("yes"));
    }

    #[tokio::test]
    async fn cancellation_closes_the_stream() {
        let (relay, _bus) = relay();
        let cancel = CancellationToken::new();
        let mut rx = relay.stream("run", cancel.clone());

        cancel.cancel();

        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert_eq!(closed.ok().flatten(), None);
    }

    #[tokio::test]
    async fn subscribe_failure_is_reported_in_stream() {
        let (relay, bus) = relay();
        bus.close();
        let mut rx = relay.stream("run", CancellationToken::new());
        let msg = next(&mut rx).await.unwrap();
        assert!(msg.starts_with("Failed to subscribe to log bus"));
    }
}

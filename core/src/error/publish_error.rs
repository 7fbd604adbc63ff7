// core/src/error/publish_error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to marshal log")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to publish log on {subject}: {reason}")]
    Bus { subject: String, reason: String },
}

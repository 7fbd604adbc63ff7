//! Log relay: sanitized records, per-run history and topic fan-out.

mod bus;
mod cache;
mod record;
mod relay;
mod subscribe;

pub use bus::{BusPayload, InMemoryBus, LogBus};
pub use cache::HistoryCache;
pub use record::{strip_ansi_codes, LogRecord};
pub use relay::{subject_for, LogRelay, SUBJECT_PREFIX};
pub use subscribe::SUBSCRIBER_BUFFER;

/// Process-wide run history keyed by run name.
pub type RunHistoryCache = HistoryCache<LogRecord>;

use chrono::{SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref ANSI_RE: Regex = Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]").expect("valid ansi pattern");
}

pub fn strip_ansi_codes(s: &str) -> String {
    ANSI_RE.replace_all(s, "").into_owned()
}

/// One line of job output as stored in the history and sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    pub timestamp: String,
}

impl LogRecord {
    pub fn new(message: &str) -> Self {
        Self {
            message: strip_ansi_codes(message),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_and_cursor_sequences() {
        let raw = "\x1b[1;32mN E X T F L O W\x1b[0m  ~  version 23.10.0\x1b[2K";
        assert_eq!(strip_ansi_codes(raw), "N E X T F L O W  ~  version 23.10.0");
    }

    #[test]
    fn strips_private_mode_sequences() {
        let out = strip_ansi_codes("\x1b[?25lprogress\x1b[?25h 50%\x1b[>4;1m");
        assert!(!out.contains('\x1b'));
        assert_eq!(out, "progress 50%");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_ansi_codes("executor >  local (3)"), "executor >  local (3)");
    }

    #[test]
    fn record_message_has_no_escape_bytes() {
        let record = LogRecord::new("\x1b[33m[ab/12cd34] process > FASTQC\x1b[m");
        assert!(!record.message.contains('\x1b'));
        assert_eq!(record.message, "[ab/12cd34] process > FASTQC");
        assert!(!record.timestamp.is_empty());
    }

    #[test]
    fn serializes_as_message_and_timestamp() {
        let record = LogRecord {
            message: "done".to_string(),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
        };
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"message": "done", "timestamp": "2024-01-01T00:00:00.000Z"})
        );
    }
}

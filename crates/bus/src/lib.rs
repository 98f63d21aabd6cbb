//! Operator notices
//!
//! The worker reports progress and failures to whoever drives it over an
//! unbounded channel. Sending never blocks and never fails the caller: once
//! the receiving side is gone, notices are only logged.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// A message for the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    /// Field the notice concerns, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<usize>,
    pub timestamp: DateTime<Local>,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            field: None,
            timestamp: Local::now(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }

    /// Attach the field index
    pub fn for_field(mut self, index: usize) -> Self {
        self.field = Some(index);
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.level)?;
        if let Some(field) = self.field {
            write!(f, "field {}: ", field)?;
        }
        f.write_str(&self.text)
    }
}

pub type NoticeSender = mpsc::UnboundedSender<Notice>;
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

/// Sending half handed to the worker
#[derive(Debug, Clone)]
pub struct NoticeBus {
    sender: NoticeSender,
}

impl NoticeBus {
    pub fn new(sender: NoticeSender) -> Self {
        Self { sender }
    }

    /// Fresh bus and its receiver
    pub fn channel() -> (Self, NoticeReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Send a notice; returns whether anyone is still listening
    pub fn publish(&self, notice: Notice) -> bool {
        trace!("◆ Notice: {}", notice);
        match self.sender.send(notice) {
            Ok(()) => true,
            Err(mpsc::error::SendError(notice)) => {
                debug!("◆ Notice dropped, no receiver: {}", notice);
                false
            }
        }
    }

    pub fn info(&self, text: impl Into<String>) -> bool {
        self.publish(Notice::info(text))
    }

    pub fn warn(&self, text: impl Into<String>) -> bool {
        self.publish(Notice::warning(text))
    }

    pub fn error(&self, text: impl Into<String>) -> bool {
        self.publish(Notice::error(text))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Everything currently queued on a receiver, without waiting
pub fn drain(receiver: &mut NoticeReceiver) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = receiver.try_recv() {
        notices.push(notice);
    }
    notices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_display() {
        let notice = Notice::warning("No seeds in storage").for_field(2);
        assert_eq!(notice.to_string(), "[warning] field 2: No seeds in storage");
        assert_eq!(Notice::info("Area selected").to_string(), "[info] Area selected");
    }

    #[test]
    fn test_levels_order_by_severity() {
        assert!(NoticeLevel::Info < NoticeLevel::Warning);
        assert!(NoticeLevel::Warning < NoticeLevel::Error);
        assert!(Notice::error("x").is_error());
        assert!(!Notice::info("x").is_error());
    }

    #[test]
    fn test_notice_serialization_skips_missing_field() {
        let json = serde_json::to_string(&Notice::info("hello")).unwrap();
        assert!(!json.contains("\"field\""));
        assert!(json.contains("\"level\":\"info\""));

        let json = serde_json::to_string(&Notice::error("boom").for_field(0)).unwrap();
        let back: Notice = serde_json::from_str(&json).unwrap();
        assert_eq!(back.field, Some(0));
        assert_eq!(back.level, NoticeLevel::Error);
    }
}

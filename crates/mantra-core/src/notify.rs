//! User-facing status messages
//!
//! Short-lived notices raised by store operations and sync cycles. The
//! front end decides how to show them; each carries the time it should
//! stay visible.

use std::fmt;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;

/// How long a notification stays visible
pub const DISPLAY_DURATION: Duration = Duration::from_secs(3);

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// A transient status message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    /// Build a notification
    ///
    /// Info messages about syncing get the local time appended so repeated
    /// notices from the periodic loop can be told apart.
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        let mut message = message.into();
        if severity == Severity::Info && message.contains("Sync") {
            message = format!("{} ({})", message, Local::now().format("%H:%M:%S"));
        }
        Self { message, severity }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    /// How long to keep this notification on screen
    pub fn display_duration(&self) -> Duration {
        DISPLAY_DURATION
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_info_gets_timestamp() {
        let n = Notification::info("Syncing with server...");
        assert!(n.message.starts_with("Syncing with server... ("));
        assert!(n.message.ends_with(')'));
    }

    #[test]
    fn test_other_messages_unchanged() {
        let n = Notification::success("Sync completed! Added 2 new quotes from server.");
        assert_eq!(n.message, "Sync completed! Added 2 new quotes from server.");

        let n = Notification::info("All quotes cleared.");
        assert_eq!(n.message, "All quotes cleared.");
    }

    #[test]
    fn test_display() {
        let n = Notification::error("Sync failed. Please try again later.");
        assert_eq!(n.to_string(), "[error] Sync failed. Please try again later.");
        assert_eq!(n.display_duration(), DISPLAY_DURATION);
    }

    #[test]
    fn test_severity_serialization() {
        let json = serde_json::to_value(Notification::success("done")).unwrap();
        assert_eq!(json["severity"], "success");
    }
}

// ============================================================================
// NOTIFICATIONS — fire-and-forget sink for terminal outcomes
// ============================================================================

use std::fmt;
use std::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Receives user-facing notifications. Implementations must return
/// promptly; the caller never waits on a notification being shown.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, severity: Severity);
}

/// Writes notifications to the session log.
#[derive(Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Info => crate::log_info!("{}: {}", title, message),
            Severity::Warning => crate::log_warn!("{}: {}", title, message),
            Severity::Error => crate::log_err!("{}: {}", title, message),
        }
    }
}

/// One delivered notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

/// Forwards notifications over an unbounded channel, for a front end that
/// drains them on its own schedule.
pub struct ChannelNotifier {
    sender: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity) {
        // Receiver gone = nobody is listening any more.
        let _ = self.sender.send(Notification {
            title: title.to_string(),
            message: message.to_string(),
            severity,
        });
    }
}

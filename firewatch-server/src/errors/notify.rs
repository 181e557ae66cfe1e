use std::time::Duration;

use crate::models::LogLevel;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notifications are disabled")]
    Disabled,

    #[error("Alert suppressed by cooldown, {}s remaining", .remaining.as_secs())]
    Suppressed { remaining: Duration },

    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification endpoint answered with status {0}")]
    Status(u16),

    #[error("Bot API rejected the request")]
    Rejected,

    #[error("Notification attachment unreadable: {0}")]
    Io(#[from] std::io::Error),
}

impl NotifyError {
    pub fn level(&self) -> LogLevel {
        match self {
            NotifyError::Disabled | NotifyError::Suppressed { .. } => LogLevel::Info,
            _ => LogLevel::Warning,
        }
    }
}

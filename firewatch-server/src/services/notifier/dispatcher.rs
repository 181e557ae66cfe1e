use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{info, warn};

use super::NotificationChannel;
use crate::configs::Notifier;
use crate::errors::NotifyError;
use crate::models::{DailyStatistics, LogLevel, Severity};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemState {
    Online,
    Offline,
}

/// Minimum spacing between two dispatched fire alerts.
#[derive(Debug)]
pub struct Cooldown {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Time left before the next alert may go out, `None` when it may go out now.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = *self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(last?);

        (elapsed < self.window).then(|| self.window - elapsed)
    }

    pub fn mark(&self, now: Instant) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(now);
    }
}

/// Formats and delivers notifications. Every call reports success as a `bool`
/// and logs the reason of a failure.
pub struct NotificationDispatcher {
    channel: Option<Arc<dyn NotificationChannel>>,
    send_images: bool,
    cooldown: Cooldown,
}

impl NotificationDispatcher {
    pub fn new(channel: Option<Arc<dyn NotificationChannel>>, notifier: &Notifier) -> Self {
        Self {
            channel,
            send_images: notifier.send_images,
            cooldown: Cooldown::new(Duration::from_secs(notifier.alert_cooldown)),
        }
    }

    pub fn disabled() -> Self {
        Self {
            channel: None,
            send_images: false,
            cooldown: Cooldown::new(Duration::ZERO),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.channel.is_some()
    }

    /// Cooldown-gated. Only a delivered alert starts a new cooldown window.
    pub async fn send_new_alert(
        &self,
        detections: i32,
        timestamp: OffsetDateTime,
        severity: Severity,
    ) -> bool {
        settle(
            "fire alert",
            self.try_send_new_alert(detections, timestamp, severity).await,
        )
    }

    pub async fn send_clear(&self, duration_seconds: i64) -> bool {
        settle(
            "alert cleared",
            self.deliver_text(format_clear(duration_seconds)).await,
        )
    }

    /// Not subject to the alert cooldown.
    pub async fn send_capture_image(
        &self,
        alert_id: i32,
        severity: Severity,
        detections: i32,
        image_path: &Path,
        timestamp: OffsetDateTime,
    ) -> bool {
        let caption = format_capture_caption(alert_id, severity, detections, timestamp);

        settle(
            "capture image",
            self.try_send_photo(image_path, &caption).await,
        )
    }

    pub async fn send_system_status(&self, state: SystemState, details: Option<&str>) -> bool {
        settle(
            "system status",
            self.deliver_text(format_system_status(state, details)).await,
        )
    }

    pub async fn send_stats_report(&self, statistics: &DailyStatistics) -> bool {
        settle(
            "statistics report",
            self.deliver_text(format_stats_report(statistics)).await,
        )
    }

    async fn try_send_new_alert(
        &self,
        detections: i32,
        timestamp: OffsetDateTime,
        severity: Severity,
    ) -> Result<(), NotifyError> {
        let channel = self.channel()?;
        if let Some(remaining) = self.cooldown.remaining(Instant::now()) {
            return Err(NotifyError::Suppressed { remaining });
        }

        channel
            .send_text(&format_new_alert(detections, timestamp, severity))
            .await?;
        self.cooldown.mark(Instant::now());

        Ok(())
    }

    async fn try_send_photo(&self, image_path: &Path, caption: &str) -> Result<(), NotifyError> {
        let channel = self.channel()?;
        if !self.send_images {
            return Err(NotifyError::Disabled);
        }

        channel.send_photo(image_path, caption).await
    }

    async fn deliver_text(&self, text: String) -> Result<(), NotifyError> {
        self.channel()?.send_text(&text).await
    }

    fn channel(&self) -> Result<&Arc<dyn NotificationChannel>, NotifyError> {
        self.channel.as_ref().ok_or(NotifyError::Disabled)
    }
}

fn settle(kind: &str, result: Result<(), NotifyError>) -> bool {
    match result {
        Ok(()) => {
            info!("Sent {} notification", kind);
            true
        }
        Err(e) if e.level() == LogLevel::Info => {
            info!("Skipped {} notification: {}", kind, e);
            false
        }
        Err(e) => {
            warn!("Failed to send {} notification: {}", kind, e);
            false
        }
    }
}

fn format_time(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| timestamp.to_string())
}

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "🟡",
        Severity::Medium => "🟠",
        Severity::High => "🔴",
    }
}

pub(crate) fn format_new_alert(
    detections: i32,
    timestamp: OffsetDateTime,
    severity: Severity,
) -> String {
    format!(
        "🔥 <b>FIRE ALERT</b>\n\n\
         {} <b>Severity:</b> {}\n\
         📊 <b>Detections:</b> {}\n\
         🕐 <b>Time:</b> {}\n\n\
         ⚠️ <i>Check the site immediately</i>",
        severity_marker(severity),
        severity,
        detections,
        format_time(timestamp)
    )
}

pub(crate) fn format_clear(duration_seconds: i64) -> String {
    let mut message = String::from("✅ <b>Alert cleared</b>");
    if duration_seconds > 0 {
        message.push_str(&format!(
            "\n\n⏱ Duration: {}m {}s",
            duration_seconds / 60,
            duration_seconds % 60
        ));
    }
    message.push_str("\n\n✓ <i>Situation back to normal</i>");

    message
}

pub(crate) fn format_capture_caption(
    alert_id: i32,
    severity: Severity,
    detections: i32,
    timestamp: OffsetDateTime,
) -> String {
    format!(
        "📸 <b>Alert #{}</b>\n\n\
         {} Severity: {}\n\
         📊 Detections: {}\n\
         🕐 Captured: {}",
        alert_id,
        severity_marker(severity),
        severity,
        detections,
        format_time(timestamp)
    )
}

pub(crate) fn format_system_status(state: SystemState, details: Option<&str>) -> String {
    let mut message = match state {
        SystemState::Online => String::from("🟢 <b>Fire monitor online</b>"),
        SystemState::Offline => String::from("🔴 <b>Fire monitor offline</b>"),
    };
    if let Some(details) = details {
        message.push_str("\n\n");
        message.push_str(details);
    }

    message
}

pub(crate) fn format_stats_report(statistics: &DailyStatistics) -> String {
    format!(
        "📊 <b>Daily report</b>\n\n\
         🔥 Detections: {}\n\
         ⚠️ Alerts: {}\n\
         📸 Images: {}\n\
         🕐 Date: {}",
        statistics.total_detections,
        statistics.total_alerts,
        statistics.images_captured,
        statistics.date
    )
}

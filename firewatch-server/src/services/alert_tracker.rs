use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::configs::Storage;
use crate::models::{Component, Detection, LogLevel, Severity};
use crate::repositories::{AlertRepository, DetectionRepository};
use crate::services::EventJournal;

pub const SENSOR_TYPE: &str = "KY-026";

/// In-memory view of the incident that is currently open.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveAlert {
    /// `None` when the alert row could not be stored.
    pub id: Option<i32>,
    pub severity: Severity,
    pub detections: i32,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, PartialEq)]
pub enum AlertTransition {
    Opened(ActiveAlert),
    Updated(ActiveAlert),
    Resolved { alert: ActiveAlert, duration: Duration },
    Unchanged,
}

/// Single-slot alert state machine. Storage failures are journaled and the
/// in-memory state advances regardless.
pub struct AlertTracker {
    alerts: AlertRepository,
    detections: DetectionRepository,
    journal: EventJournal,
    current: Option<ActiveAlert>,
}

impl AlertTracker {
    pub fn new(storage: Arc<Storage>, journal: EventJournal) -> Self {
        Self {
            alerts: AlertRepository::new(storage.clone()),
            detections: DetectionRepository::new(storage),
            journal,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&ActiveAlert> {
        self.current.as_ref()
    }

    /// Picks up an alert left ACTIVE by a previous run.
    pub async fn restore(&mut self) -> Result<Option<&ActiveAlert>, sqlx::Error> {
        self.current = self
            .alerts
            .find_active()
            .await?
            .map(|alert| ActiveAlert {
                id: Some(alert.id),
                severity: alert.severity,
                detections: alert.detections_count,
                created_at: alert.created_at,
            });

        Ok(self.current.as_ref())
    }

    pub async fn on_fire_detected(
        &mut self,
        detections: i32,
        sensor_timestamp: Option<i64>,
        now: OffsetDateTime,
    ) -> AlertTransition {
        let detection_id = self.append_detection(true, sensor_timestamp, now).await;

        if let Some(active) = &mut self.current {
            active.detections = detections;
            if let Some(id) = active.id {
                if let Err(e) = self.alerts.update_detections(id, detections).await {
                    self.journal
                        .record(
                            LogLevel::Error,
                            Component::Database,
                            format!("Failed to update detections of alert {id}: {e}"),
                        )
                        .await;
                }
            }

            return AlertTransition::Updated(active.clone());
        }

        let severity = Severity::from_detections(detections);
        let id = match self
            .alerts
            .create(detection_id, severity, detections, now)
            .await
        {
            Ok(alert) => Some(alert.id),
            Err(e) => {
                self.journal
                    .record(
                        LogLevel::Error,
                        Component::Database,
                        format!("Failed to create alert: {e}"),
                    )
                    .await;
                None
            }
        };

        let active = ActiveAlert {
            id,
            severity,
            detections,
            created_at: now,
        };
        self.current = Some(active.clone());

        self.journal
            .record(
                LogLevel::Warning,
                Component::Alert,
                format!(
                    "Fire alert {} opened, severity {severity}, {detections} detections",
                    id.map_or_else(|| String::from("(unsaved)"), |id| id.to_string())
                ),
            )
            .await;

        AlertTransition::Opened(active)
    }

    pub async fn on_clear(
        &mut self,
        sensor_timestamp: Option<i64>,
        now: OffsetDateTime,
    ) -> AlertTransition {
        self.append_detection(false, sensor_timestamp, now).await;

        let Some(alert) = self.current.take() else {
            return AlertTransition::Unchanged;
        };

        if let Some(id) = alert.id {
            if let Err(e) = self.alerts.resolve(id, now).await {
                self.journal
                    .record(
                        LogLevel::Error,
                        Component::Database,
                        format!("Failed to resolve alert {id}: {e}"),
                    )
                    .await;
            }
        }

        let duration = now - alert.created_at;
        self.journal
            .record(
                LogLevel::Info,
                Component::Alert,
                format!("Fire alert cleared after {}s", duration.whole_seconds()),
            )
            .await;

        AlertTransition::Resolved { alert, duration }
    }

    async fn append_detection(
        &self,
        detected: bool,
        sensor_timestamp: Option<i64>,
        now: OffsetDateTime,
    ) -> Option<i32> {
        let detection = Detection {
            id: 0,
            sensor_type: String::from(SENSOR_TYPE),
            detected,
            confidence: 100,
            sensor_timestamp,
            time: now,
        };

        match self.detections.create(&detection).await {
            Ok(id) => Some(id),
            Err(e) => {
                self.journal
                    .record(
                        LogLevel::Error,
                        Component::Database,
                        format!("Failed to append detection: {e}"),
                    )
                    .await;
                None
            }
        }
    }
}

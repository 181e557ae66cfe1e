use std::sync::Arc;
use std::time::Duration;

use time::{Date, OffsetDateTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::configs::Storage;
use crate::models::{Component, DailyStatistics, LogLevel};
use crate::repositories::{
    CapturedImageRepository, StatisticsRepository, SystemConfigRepository, SystemLogRepository,
};
use crate::services::{EventJournal, NotificationDispatcher};

pub const IMAGE_RETENTION_KEY: &str = "image_retention_days";
pub const LOG_RETENTION_KEY: &str = "log_retention_days";
const DEFAULT_IMAGE_RETENTION_DAYS: i64 = 30;
const DEFAULT_LOG_RETENTION_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub images_deleted: u64,
    pub logs_deleted: u64,
}

/// Periodic daily-statistics refresh, retention and the end-of-day report.
/// Never touches router state.
#[derive(Clone)]
pub struct StatisticsService {
    statistics: StatisticsRepository,
    images: CapturedImageRepository,
    logs: SystemLogRepository,
    config: SystemConfigRepository,
    dispatcher: Arc<NotificationDispatcher>,
    journal: EventJournal,
}

impl StatisticsService {
    pub fn new(
        storage: Arc<Storage>,
        dispatcher: Arc<NotificationDispatcher>,
        journal: EventJournal,
    ) -> Self {
        Self {
            statistics: StatisticsRepository::new(storage.clone()),
            images: CapturedImageRepository::new(storage.clone()),
            logs: SystemLogRepository::new(storage.clone()),
            config: SystemConfigRepository::new(storage),
            dispatcher,
            journal,
        }
    }

    pub async fn refresh_today(&self) -> Result<DailyStatistics, sqlx::Error> {
        self.statistics.refresh_today().await
    }

    pub async fn apply_retention(&self) -> Result<MaintenanceReport, sqlx::Error> {
        let image_days = self
            .config
            .get_i64_or(IMAGE_RETENTION_KEY, DEFAULT_IMAGE_RETENTION_DAYS)
            .await?;
        let log_days = self
            .config
            .get_i64_or(LOG_RETENTION_KEY, DEFAULT_LOG_RETENTION_DAYS)
            .await?;

        Ok(MaintenanceReport {
            images_deleted: self.images.delete_older_than(image_days).await?,
            logs_deleted: self.logs.delete_older_than(log_days).await?,
        })
    }

    /// One maintenance pass. Failures are journaled.
    pub async fn run_once(&self) {
        match self.refresh_today().await {
            Ok(statistics) => info!(
                "Statistics updated: {} detections, {} alerts, {} images",
                statistics.total_detections, statistics.total_alerts, statistics.images_captured
            ),
            Err(e) => {
                self.journal
                    .record(
                        LogLevel::Error,
                        Component::Database,
                        format!("Failed to refresh daily statistics: {e}"),
                    )
                    .await
            }
        }

        match self.apply_retention().await {
            Ok(report) if report != MaintenanceReport::default() => {
                self.journal
                    .record(
                        LogLevel::Info,
                        Component::Database,
                        format!(
                            "Retention removed {} image records and {} log entries",
                            report.images_deleted, report.logs_deleted
                        ),
                    )
                    .await
            }
            Ok(_) => {}
            Err(e) => {
                self.journal
                    .record(
                        LogLevel::Error,
                        Component::Database,
                        format!("Failed to apply retention: {e}"),
                    )
                    .await
            }
        }
    }

    /// Once `today` has moved past `day`, finalizes `day` and sends its report.
    /// Returns the day now being tracked.
    pub async fn close_day(&self, day: Date, today: Date) -> Date {
        if today <= day {
            return day;
        }

        match self.statistics.refresh(day).await {
            Ok(statistics) => {
                self.dispatcher.send_stats_report(&statistics).await;
            }
            Err(e) => {
                self.journal
                    .record(
                        LogLevel::Error,
                        Component::Database,
                        format!("Failed to finalize statistics for {day}: {e}"),
                    )
                    .await
            }
        }

        today
    }

    /// Runs a pass every `interval` until `shutdown` flips. The first pass waits one full interval.
    pub fn spawn(self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut day = OffsetDateTime::now_utc().date();

            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        self.run_once().await;
                        day = self.close_day(day, OffsetDateTime::now_utc().date()).await;
                    }
                }
            }

            info!("Statistics task stopped");
        })
    }
}

use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite};
use time::{Date, Duration, OffsetDateTime};

use super::day_bounds;
use crate::configs::Storage;
use crate::models::DailyStatistics;

#[derive(Clone)]
pub struct StatisticsRepository {
    storage: Arc<Storage>,
}

impl StatisticsRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl StatisticsRepository {
    /// Recomputes the aggregate row for `date` from the raw tables.
    pub async fn refresh(&self, date: Date) -> Result<DailyStatistics, Error> {
        let (start, end) = day_bounds(date);
        let mut transaction = self.get_pool().begin().await?;

        let (detections, alerts, images): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM detections WHERE detected = 1 AND time >= $1 AND time < $2),
                (SELECT COUNT(*) FROM alerts WHERE created_at >= $1 AND created_at < $2),
                (SELECT COUNT(*) FROM captured_images WHERE capture_time >= $1 AND capture_time < $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&mut *transaction)
        .await?;

        let statistics: DailyStatistics = sqlx::query_as(
            r#"
            INSERT INTO daily_statistics (date, total_detections, total_alerts, images_captured)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (date) DO UPDATE SET
                total_detections = excluded.total_detections,
                total_alerts = excluded.total_alerts,
                images_captured = excluded.images_captured
            RETURNING *;
            "#,
        )
        .bind(date)
        .bind(detections)
        .bind(alerts)
        .bind(images)
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(statistics)
    }

    pub async fn refresh_today(&self) -> Result<DailyStatistics, Error> {
        self.refresh(OffsetDateTime::now_utc().date()).await
    }

    pub async fn find_by_date(&self, date: Date) -> Result<Option<DailyStatistics>, Error> {
        let statistics: Option<DailyStatistics> =
            sqlx::query_as("SELECT * FROM daily_statistics WHERE date = $1")
                .bind(date)
                .fetch_optional(self.get_pool())
                .await?;

        Ok(statistics)
    }

    /// Rows for the last `days` days, newest first.
    pub async fn find_range(&self, days: i64) -> Result<Vec<DailyStatistics>, Error> {
        let since = OffsetDateTime::now_utc().date() - Duration::days(days);
        let statistics: Vec<DailyStatistics> = sqlx::query_as(
            "SELECT * FROM daily_statistics WHERE date >= $1 ORDER BY date DESC",
        )
        .bind(since)
        .fetch_all(self.get_pool())
        .await?;

        Ok(statistics)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Detection, Severity};
    use crate::repositories::{AlertRepository, DetectionRepository};
    use crate::tests::*;

    use super::*;

    #[tokio::test]
    async fn test_refresh_counts_only_positive_detections_of_the_day() {
        let storage = setup_test_db().await;
        let detections = DetectionRepository::new(storage.clone());
        let now = OffsetDateTime::now_utc();

        for (detected, time) in [
            (true, now),
            (true, now),
            (false, now),
            (true, now - Duration::days(2)),
        ] {
            detections
                .create(&Detection {
                    id: 0,
                    sensor_type: String::from("KY-026"),
                    detected,
                    confidence: 100,
                    sensor_timestamp: None,
                    time,
                })
                .await
                .unwrap();
        }
        AlertRepository::new(storage.clone())
            .create(None, Severity::Low, 1, now)
            .await
            .unwrap();

        let repo = StatisticsRepository::new(storage.clone());
        let statistics = repo.refresh(now.date()).await.unwrap();
        assert_eq!(statistics.total_detections, 2);
        assert_eq!(statistics.total_alerts, 1);
        assert_eq!(statistics.images_captured, 0);

        // Refreshing again overwrites instead of adding a second row
        repo.refresh(now.date()).await.unwrap();
        assert_eq!(repo.find_range(1).await.unwrap().len(), 1);
        assert!(repo.find_by_date(now.date()).await.unwrap().is_some());
    }
}

use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::{Alert, AlertStatus, Severity};

pub const FIRE_DETECTED: &str = "FIRE_DETECTED";

#[derive(Clone)]
pub struct AlertRepository {
    storage: Arc<Storage>,
}

impl AlertRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl AlertRepository {
    /// Opens a new ACTIVE fire alert.
    pub async fn create(
        &self,
        detection_id: Option<i32>,
        severity: Severity,
        detections_count: i32,
        created_at: OffsetDateTime,
    ) -> Result<Alert, Error> {
        let alert: Alert = sqlx::query_as(
            r#"
            INSERT INTO alerts (detection_id, alert_type, severity, detections_count, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
            "#,
        )
        .bind(detection_id)
        .bind(FIRE_DETECTED)
        .bind(severity.as_str())
        .bind(detections_count)
        .bind(AlertStatus::Active.as_str())
        .bind(created_at)
        .fetch_one(self.get_pool())
        .await?;

        Ok(alert)
    }

    /// Newest ACTIVE alert, if any.
    pub async fn find_active(&self) -> Result<Option<Alert>, Error> {
        let alert: Option<Alert> = sqlx::query_as(
            r#"
            SELECT * FROM alerts
            WHERE status = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(AlertStatus::Active.as_str())
        .fetch_optional(self.get_pool())
        .await?;

        Ok(alert)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Alert>, Error> {
        let alert: Option<Alert> = sqlx::query_as("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?;

        Ok(alert)
    }

    pub async fn find_all(
        &self,
        status: Option<AlertStatus>,
        limit: i64,
    ) -> Result<Vec<Alert>, Error> {
        let alerts: Vec<Alert> = sqlx::query_as(
            r#"
            SELECT * FROM alerts
            WHERE $1 IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(status.map(|status| status.as_str()))
        .bind(limit)
        .fetch_all(self.get_pool())
        .await?;

        Ok(alerts)
    }

    pub async fn update_detections(&self, id: i32, detections_count: i32) -> Result<(), Error> {
        sqlx::query("UPDATE alerts SET detections_count = $1 WHERE id = $2")
            .bind(detections_count)
            .bind(id)
            .execute(self.get_pool())
            .await?;

        Ok(())
    }

    pub async fn resolve(&self, id: i32, resolved_at: OffsetDateTime) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE alerts
            SET status = $1, resolved_at = $2
            WHERE id = $3
            "#,
        )
        .bind(AlertStatus::Resolved.as_str())
        .bind(resolved_at)
        .bind(id)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    pub async fn count_active(&self) -> Result<i64, Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE status = $1")
            .bind(AlertStatus::Active.as_str())
            .fetch_one(self.get_pool())
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use crate::tests::*;

    use super::*;

    #[tokio::test]
    async fn test_create_and_find_active_alert() {
        let storage = setup_test_db().await;
        let repo = AlertRepository::new(storage.clone());

        assert!(repo.find_active().await.unwrap().is_none());

        let now = OffsetDateTime::now_utc();
        let alert = repo.create(None, Severity::Medium, 3, now).await.unwrap();
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.severity, Severity::Medium);
        assert_eq!(alert.alert_type, FIRE_DETECTED);

        let active = repo.find_active().await.unwrap().unwrap();
        assert_eq!(active.id, alert.id);
        assert_eq!(active.detections_count, 3);
    }

    #[tokio::test]
    async fn test_update_detections_keeps_severity() {
        let storage = setup_test_db().await;
        let repo = AlertRepository::new(storage.clone());

        let alert = repo
            .create(None, Severity::Low, 1, OffsetDateTime::now_utc())
            .await
            .unwrap();
        repo.update_detections(alert.id, 9).await.unwrap();

        let found = repo.find_by_id(alert.id).await.unwrap().unwrap();
        assert_eq!(found.detections_count, 9);
        assert_eq!(found.severity, Severity::Low);
    }

    #[tokio::test]
    async fn test_resolve_alert() {
        let storage = setup_test_db().await;
        let repo = AlertRepository::new(storage.clone());

        let created_at = OffsetDateTime::now_utc() - Duration::minutes(5);
        let alert = repo.create(None, Severity::High, 7, created_at).await.unwrap();
        repo.resolve(alert.id, OffsetDateTime::now_utc()).await.unwrap();

        let found = repo.find_by_id(alert.id).await.unwrap().unwrap();
        assert_eq!(found.status, AlertStatus::Resolved);
        assert!(found.resolved_at.unwrap() > found.created_at);
        assert!(repo.find_active().await.unwrap().is_none());
        assert_eq!(repo.count_active().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_all_filters_by_status() {
        let storage = setup_test_db().await;
        let repo = AlertRepository::new(storage.clone());
        let now = OffsetDateTime::now_utc();

        let first = repo.create(None, Severity::Low, 1, now).await.unwrap();
        repo.resolve(first.id, now).await.unwrap();
        repo.create(None, Severity::Low, 1, now).await.unwrap();

        assert_eq!(repo.find_all(None, 10).await.unwrap().len(), 2);
        assert_eq!(repo.find_all(Some(AlertStatus::Resolved), 10).await.unwrap().len(), 1);
        assert_eq!(repo.find_all(Some(AlertStatus::Active), 10).await.unwrap().len(), 1);
    }
}

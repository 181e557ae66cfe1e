use std::sync::Arc;

use serde_json::Value;
use sqlx::{Error, Pool, Sqlite};
use time::{Duration, OffsetDateTime};

use crate::configs::Storage;
use crate::models::{Component, LogLevel, SystemLog};

#[derive(Clone)]
pub struct SystemLogRepository {
    storage: Arc<Storage>,
}

impl SystemLogRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl SystemLogRepository {
    pub async fn create(
        &self,
        level: LogLevel,
        component: Component,
        message: &str,
        details: Option<&Value>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO system_logs (log_level, component, message, details, time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(level.as_str())
        .bind(component.as_str())
        .bind(message)
        .bind(details)
        .bind(OffsetDateTime::now_utc())
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find(
        &self,
        level: Option<LogLevel>,
        component: Option<Component>,
        limit: i64,
    ) -> Result<Vec<SystemLog>, Error> {
        let logs: Vec<SystemLog> = sqlx::query_as(
            r#"
            SELECT * FROM system_logs
            WHERE ($1 IS NULL OR log_level = $1)
              AND ($2 IS NULL OR component = $2)
            ORDER BY time DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(level.map(|level| level.as_str()))
        .bind(component.map(|component| component.as_str()))
        .bind(limit)
        .fetch_all(self.get_pool())
        .await?;

        Ok(logs)
    }

    pub async fn delete_older_than(&self, days: i64) -> Result<u64, Error> {
        let threshold = OffsetDateTime::now_utc() - Duration::days(days);
        let deleted = sqlx::query("DELETE FROM system_logs WHERE time < $1")
            .bind(threshold)
            .execute(self.get_pool())
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::tests::*;

    use super::*;

    #[tokio::test]
    async fn test_create_and_filter_logs() {
        let storage = setup_test_db().await;
        let repo = SystemLogRepository::new(storage.clone());

        repo.create(LogLevel::Info, Component::Mqtt, "connected", None)
            .await
            .unwrap();
        repo.create(
            LogLevel::Error,
            Component::Camera,
            "missing fragments",
            Some(&json!({"missing": [1, 2]})),
        )
        .await
        .unwrap();

        assert_eq!(repo.find(None, None, 10).await.unwrap().len(), 2);

        let errors = repo.find(Some(LogLevel::Error), None, 10).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].component, "CAMERA");
        assert_eq!(errors[0].details, Some(json!({"missing": [1, 2]})));

        let mqtt = repo.find(None, Some(Component::Mqtt), 10).await.unwrap();
        assert_eq!(mqtt.len(), 1);
        assert_eq!(mqtt[0].message, "connected");
    }

    #[tokio::test]
    async fn test_delete_older_than_keeps_fresh_logs() {
        let storage = setup_test_db().await;
        let repo = SystemLogRepository::new(storage.clone());

        repo.create(LogLevel::Info, Component::System, "boot", None)
            .await
            .unwrap();

        assert_eq!(repo.delete_older_than(7).await.unwrap(), 0);
        assert_eq!(repo.find(None, None, 10).await.unwrap().len(), 1);
    }
}

use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::{ConfigValue, SystemConfig};

#[derive(Clone)]
pub struct SystemConfigRepository {
    storage: Arc<Storage>,
}

impl SystemConfigRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl SystemConfigRepository {
    pub async fn find(&self, key: &str) -> Result<Option<SystemConfig>, Error> {
        let item: Option<SystemConfig> =
            sqlx::query_as("SELECT * FROM system_config WHERE key = $1")
                .bind(key)
                .fetch_optional(self.get_pool())
                .await?;

        Ok(item)
    }

    pub async fn get(&self, key: &str) -> Result<Option<ConfigValue>, Error> {
        Ok(self.find(key).await?.as_ref().map(ConfigValue::from))
    }

    pub async fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, Error> {
        Ok(self
            .get(key)
            .await?
            .and_then(|value| value.as_i64())
            .unwrap_or(default))
    }

    /// Upserts `key`. An existing description is kept when `description` is `None`.
    pub async fn set(
        &self,
        key: &str,
        value: &ConfigValue,
        description: Option<&str>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO system_config (key, value, value_type, description, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                value_type = excluded.value_type,
                description = COALESCE(excluded.description, system_config.description),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value.encode())
        .bind(value.value_type())
        .bind(description)
        .bind(OffsetDateTime::now_utc())
        .execute(self.get_pool())
        .await?;

        Ok(())
    }
}

use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite};

use crate::configs::Storage;
use crate::models::DeviceStatus;

#[derive(Clone)]
pub struct DeviceStatusRepository {
    storage: Arc<Storage>,
}

impl DeviceStatusRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl DeviceStatusRepository {
    /// One row per device, the latest report wins.
    pub async fn upsert(&self, item: &DeviceStatus) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO device_status (device_id, status, ip_address, uptime_seconds, last_seen)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (device_id) DO UPDATE SET
                status = excluded.status,
                ip_address = excluded.ip_address,
                uptime_seconds = excluded.uptime_seconds,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(&item.device_id)
        .bind(&item.status)
        .bind(&item.ip_address)
        .bind(item.uptime_seconds)
        .bind(item.last_seen)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    pub async fn find_by_device(&self, device_id: &str) -> Result<Option<DeviceStatus>, Error> {
        let status: Option<DeviceStatus> =
            sqlx::query_as("SELECT * FROM device_status WHERE device_id = $1")
                .bind(device_id)
                .fetch_optional(self.get_pool())
                .await?;

        Ok(status)
    }

    pub async fn find_all(&self) -> Result<Vec<DeviceStatus>, Error> {
        let statuses: Vec<DeviceStatus> =
            sqlx::query_as("SELECT * FROM device_status ORDER BY device_id")
                .fetch_all(self.get_pool())
                .await?;

        Ok(statuses)
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceStatus {
    pub device_id: String,
    pub status: String,
    pub ip_address: Option<String>,
    pub uptime_seconds: Option<i64>,
    pub last_seen: OffsetDateTime,
}

#[derive(Clone)]
pub struct DeviceStatusTable;

impl Table for DeviceStatusTable {
    fn name(&self) -> &'static str {
        "device_status"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS device_status (
                device_id VARCHAR(100) PRIMARY KEY,
                status VARCHAR(20) NOT NULL,
                ip_address VARCHAR(45),
                uptime_seconds INTEGER,
                last_seen TIMESTAMP NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS device_status;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}

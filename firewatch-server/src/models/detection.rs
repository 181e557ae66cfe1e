use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

/// One reading reported on the alert topic, kept as an append-only audit trail.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Detection {
    pub id: i32,
    pub sensor_type: String,
    pub detected: bool,
    /// 0 to 100
    pub confidence: i32,
    /// Device clock in milliseconds since boot, not comparable across reboots
    pub sensor_timestamp: Option<i64>,
    pub time: OffsetDateTime,
}

#[derive(Clone)]
pub struct DetectionTable;

impl Table for DetectionTable {
    fn name(&self) -> &'static str {
        "detections"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS detections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sensor_type VARCHAR(50) NOT NULL DEFAULT 'KY-026',
                detected BOOLEAN NOT NULL,
                confidence INTEGER NOT NULL DEFAULT 100 CHECK (confidence BETWEEN 0 AND 100),
                sensor_timestamp INTEGER,
                time TIMESTAMP NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS detections;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}

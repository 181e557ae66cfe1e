use serde::{Deserialize, Serialize};
use time::Date;

use super::Table;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyStatistics {
    pub date: Date,
    pub total_detections: i64,
    pub total_alerts: i64,
    pub images_captured: i64,
}

#[derive(Clone)]
pub struct DailyStatisticsTable;

impl Table for DailyStatisticsTable {
    fn name(&self) -> &'static str {
        "daily_statistics"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS daily_statistics (
                date DATE PRIMARY KEY,
                total_detections INTEGER NOT NULL DEFAULT 0,
                total_alerts INTEGER NOT NULL DEFAULT 0,
                images_captured INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS daily_statistics;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaptureTrigger {
    /// Requested by the gateway after a detection
    Auto,
    /// Pushed by the camera without a pending request
    Manual,
}

impl CaptureTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureTrigger::Auto => "AUTO",
            CaptureTrigger::Manual => "MANUAL",
        }
    }
}

impl TryFrom<String> for CaptureTrigger {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "AUTO" => Ok(CaptureTrigger::Auto),
            "MANUAL" => Ok(CaptureTrigger::Manual),
            other => Err(format!("unknown capture trigger `{other}`")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CapturedImage {
    pub id: i32,
    pub alert_id: Option<i32>,
    pub file_path: String,
    pub file_name: String,
    pub image_size: i64,
    pub width: i32,
    pub height: i32,
    pub chunks_total: i32,
    #[sqlx(try_from = "String")]
    pub capture_trigger: CaptureTrigger,
    pub capture_time: OffsetDateTime,
}

#[derive(Clone)]
pub struct CapturedImageTable;

impl Table for CapturedImageTable {
    fn name(&self) -> &'static str {
        "captured_images"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS captured_images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                alert_id INTEGER,
                file_path TEXT NOT NULL,
                file_name VARCHAR(255) NOT NULL,
                image_size INTEGER NOT NULL,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                chunks_total INTEGER NOT NULL DEFAULT 1,
                capture_trigger VARCHAR(10) NOT NULL CHECK (capture_trigger IN ('AUTO', 'MANUAL')),
                capture_time TIMESTAMP NOT NULL,
                FOREIGN KEY (alert_id) REFERENCES alerts (id) ON DELETE SET NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS captured_images;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["alerts"]
    }
}

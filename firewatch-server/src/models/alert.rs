use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// More than five detections is HIGH, more than two is MEDIUM.
    pub fn from_detections(detections: i32) -> Self {
        if detections > 5 {
            Severity::High
        } else if detections > 2 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            other => Err(format!("unknown severity `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "ACTIVE",
            AlertStatus::Resolved => "RESOLVED",
        }
    }
}

impl TryFrom<String> for AlertStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ACTIVE" => Ok(AlertStatus::Active),
            "RESOLVED" => Ok(AlertStatus::Resolved),
            other => Err(format!("unknown alert status `{other}`")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: i32,
    /// Detection that opened the incident
    pub detection_id: Option<i32>,
    pub alert_type: String,
    #[sqlx(try_from = "String")]
    pub severity: Severity,
    pub detections_count: i32,
    #[sqlx(try_from = "String")]
    pub status: AlertStatus,
    pub created_at: OffsetDateTime,
    pub resolved_at: Option<OffsetDateTime>,
}

#[derive(Clone)]
pub struct AlertTable;

impl Table for AlertTable {
    fn name(&self) -> &'static str {
        "alerts"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                detection_id INTEGER,
                alert_type VARCHAR(50) NOT NULL,
                severity VARCHAR(10) NOT NULL CHECK (severity IN ('LOW', 'MEDIUM', 'HIGH')),
                detections_count INTEGER NOT NULL DEFAULT 0,
                status VARCHAR(10) NOT NULL CHECK (status IN ('ACTIVE', 'RESOLVED')),
                created_at TIMESTAMP NOT NULL,
                resolved_at TIMESTAMP,
                FOREIGN KEY (detection_id) REFERENCES detections (id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts (status, created_at);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS alerts;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["detections"]
    }
}

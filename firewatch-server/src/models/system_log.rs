use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::Table;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Component {
    Mqtt,
    Alert,
    Camera,
    System,
    Database,
    Notifier,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Mqtt => "MQTT",
            Component::Alert => "ALERT",
            Component::Camera => "CAMERA",
            Component::System => "SYSTEM",
            Component::Database => "DATABASE",
            Component::Notifier => "NOTIFIER",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct SystemLog {
    pub id: i32,
    pub log_level: String,
    pub component: String,
    pub message: String,
    pub details: Option<Value>,
    pub time: OffsetDateTime,
}

#[derive(Clone)]
pub struct SystemLogTable;

impl Table for SystemLogTable {
    fn name(&self) -> &'static str {
        "system_logs"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS system_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                log_level VARCHAR(10) NOT NULL,
                component VARCHAR(20) NOT NULL,
                message TEXT NOT NULL,
                details JSON,
                time TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_system_logs_time ON system_logs (time);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS system_logs;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::Table;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct SystemConfig {
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub description: Option<String>,
    pub updated_at: OffsetDateTime,
}

/// A config value together with the type tag it is stored under.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Json(Value),
}

impl ConfigValue {
    pub fn value_type(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "string",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::Boolean(_) => "boolean",
            ConfigValue::Json(_) => "json",
        }
    }

    pub fn encode(&self) -> String {
        match self {
            ConfigValue::String(value) => value.clone(),
            ConfigValue::Integer(value) => value.to_string(),
            ConfigValue::Float(value) => value.to_string(),
            ConfigValue::Boolean(value) => value.to_string(),
            ConfigValue::Json(value) => value.to_string(),
        }
    }

    /// Unknown tags and unparsable values fall back to the raw string.
    pub fn decode(value: &str, value_type: &str) -> Self {
        let parsed = match value_type {
            "integer" => value.parse().ok().map(ConfigValue::Integer),
            "float" => value.parse().ok().map(ConfigValue::Float),
            "boolean" => Some(ConfigValue::Boolean(value.eq_ignore_ascii_case("true"))),
            "json" => serde_json::from_str(value).ok().map(ConfigValue::Json),
            _ => None,
        };

        parsed.unwrap_or_else(|| ConfigValue::String(value.to_string()))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(value) => Some(*value),
            ConfigValue::String(value) => value.parse().ok(),
            _ => None,
        }
    }
}

impl From<&SystemConfig> for ConfigValue {
    fn from(item: &SystemConfig) -> Self {
        ConfigValue::decode(&item.value, &item.value_type)
    }
}

#[derive(Clone)]
pub struct SystemConfigTable;

impl Table for SystemConfigTable {
    fn name(&self) -> &'static str {
        "system_config"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS system_config (
                key VARCHAR(100) PRIMARY KEY,
                value TEXT NOT NULL,
                value_type VARCHAR(10) NOT NULL DEFAULT 'string',
                description TEXT,
                updated_at TIMESTAMP NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS system_config;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}

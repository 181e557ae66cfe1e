use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::configs::normalize_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,
    #[serde(default)]
    pub topic: GatewayTopic,
    #[serde(default = "default_capture_command")]
    pub capture_command: String,
    pub auth: Option<GatewayAuth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayAuth {
    pub cert_path: String,
    pub key_path: String,
}

/// Topic names shared with the camera firmware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayTopic {
    pub alert: String,
    pub capture: String,
    pub image: String,
    pub image_meta: String,
    pub status: String,
}

impl Default for GatewayTopic {
    fn default() -> Self {
        Self {
            alert: String::from("fire/alert"),
            capture: String::from("fire/capture"),
            image: String::from("fire/image"),
            image_meta: String::from("fire/image/meta"),
            status: String::from("fire/status"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub migration_path: Option<String>,
    pub clean_start: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Images {
    pub directory: String,
    pub latest_path: String,
    /// Largest fragment count a transfer may declare.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notifier {
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_true")]
    pub send_images: bool,
    /// Minimum seconds between two fire alert messages.
    #[serde(default = "default_alert_cooldown")]
    pub alert_cooldown: u64,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Notifier {
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    /// Seconds between two maintenance runs.
    pub interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub gateway: Gateway,
    pub database: Database,
    pub images: Images,
    pub notifier: Notifier,
    pub statistics: Statistics,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("FIREWATCH").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(auth) = &settings.gateway.auth {
            let cert_path = normalize_path(&auth.cert_path)
                .map_err(|e| ConfigError::Message(e.to_string()))?
                .to_string_lossy()
                .to_string();
            let key_path = normalize_path(&auth.key_path)
                .map_err(|e| ConfigError::Message(e.to_string()))?
                .to_string_lossy()
                .to_string();

            settings.gateway.auth = Some(GatewayAuth { cert_path, key_path });
        }

        if let Some(migrate) = &settings.database.migration_path {
            if Path::new(migrate).is_dir() {
                let migrate_path = normalize_path(migrate)
                    .map_err(|e| ConfigError::Message(e.to_string()))?
                    .to_string_lossy()
                    .to_string();

                settings.database.migration_path = Some(migrate_path);
            } else {
                settings.database.migration_path = None;
            }
        }

        Ok(settings)
    }
}

fn default_keep_alive() -> u64 {
    60
}

fn default_capture_command() -> String {
    String::from("CAPTURE")
}

fn default_api_base() -> String {
    String::from("https://api.telegram.org")
}

fn default_max_chunks() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

fn default_alert_cooldown() -> u64 {
    10
}

fn default_timeout() -> u64 {
    10
}

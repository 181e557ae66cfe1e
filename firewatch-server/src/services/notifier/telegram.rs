use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

use super::NotificationChannel;
use crate::configs::Notifier;
use crate::errors::NotifyError;

const PARSE_MODE: &str = "HTML";

#[derive(Debug, Deserialize)]
struct BotResponse<T> {
    ok: bool,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
}

/// Telegram Bot API client bound to one chat.
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(notifier: &Notifier) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(notifier.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/bot{}",
                notifier.api_base.trim_end_matches('/'),
                notifier.bot_token
            ),
            chat_id: notifier.chat_id.clone(),
        })
    }

    /// Calls `getMe` and returns the bot's username.
    pub async fn verify(&self) -> Result<String, NotifyError> {
        let response = self
            .client
            .get(format!("{}/getMe", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }

        let body: BotResponse<BotUser> = response.json().await?;
        match body.result {
            Some(user) if body.ok => Ok(user.username.unwrap_or_else(|| String::from("unknown"))),
            _ => Err(NotifyError::Rejected),
        }
    }

    async fn check(response: reqwest::Response) -> Result<(), NotifyError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(response.status().as_u16()))
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": PARSE_MODE,
            }))
            .send()
            .await?;

        Self::check(response).await
    }

    async fn send_photo(&self, path: &Path, caption: &str) -> Result<(), NotifyError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("capture.jpg"));

        let photo = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .text("parse_mode", PARSE_MODE)
            .part("photo", photo);

        let response = self
            .client
            .post(format!("{}/sendPhoto", self.base_url))
            .multipart(form)
            .send()
            .await?;

        Self::check(response).await
    }
}

use super::{ImageError, NotifyError, TransferError};
use crate::models::LogLevel;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Payload decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Mqtt error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn level(&self) -> LogLevel {
        match self {
            GatewayError::Transfer(e) => e.level(),
            GatewayError::Notify(e) => e.level(),
            GatewayError::Internal(_) => LogLevel::Critical,
            _ => LogLevel::Error,
        }
    }
}

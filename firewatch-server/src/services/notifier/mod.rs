mod dispatcher;
mod telegram;

pub use dispatcher::*;
pub use telegram::*;

use std::path::Path;

use async_trait::async_trait;

use crate::errors::NotifyError;

/// Push channel the dispatcher delivers through.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError>;

    async fn send_photo(&self, path: &Path, caption: &str) -> Result<(), NotifyError>;
}

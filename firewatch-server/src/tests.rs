use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::configs::{Database, SchemaManager, Storage};
use crate::errors::{GatewayError, NotifyError};
use crate::services::{CommandPublisher, NotificationChannel};

pub async fn setup_test_db() -> Arc<Storage> {
    Arc::new(
        Storage::new(
            Database {
                migration_path: None,
                clean_start: true,
                url: String::from("sqlite::memory:"),
            },
            SchemaManager::default(),
        )
        .await
        .unwrap(),
    )
}

/// Smallest byte stream the image store accepts as a JPEG of the given size.
pub fn sample_jpeg(width: u16, height: u16) -> Vec<u8> {
    let [width_high, width_low] = width.to_be_bytes();
    let [height_high, height_low] = height.to_be_bytes();

    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(&[
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
        0x01, 0x00, 0x00,
    ]);
    data.extend_from_slice(&[
        0xFF, 0xC0, 0x00, 0x11, 0x08, height_high, height_low, width_high, width_low, 0x03, 0x01,
        0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01,
    ]);
    data.extend_from_slice(&[
        0xFF, 0xDA, 0x00, 0x0C, 0x03, 0x01, 0x00, 0x02, 0x11, 0x03, 0x11, 0x00, 0x3F, 0x00,
    ]);
    data.extend_from_slice(&[0x12, 0x34, 0x56, 0x78, 0xFF, 0xD9]);

    data
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentNotification {
    Text(String),
    Photo { path: PathBuf, caption: String },
}

/// Notification channel that keeps everything it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<SentNotification>>,
    failing: AtomicBool,
}

impl RecordingChannel {
    pub fn failing() -> Self {
        let channel = Self::default();
        channel.set_failing(true);
        channel
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                SentNotification::Text(text) => Some(text),
                SentNotification::Photo { .. } => None,
            })
            .collect()
    }

    pub fn photos(&self) -> Vec<(PathBuf, String)> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                SentNotification::Photo { path, caption } => Some((path, caption)),
                SentNotification::Text(_) => None,
            })
            .collect()
    }

    fn push(&self, notification: SentNotification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Status(500));
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);

        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        self.push(SentNotification::Text(text.to_string()))
    }

    async fn send_photo(&self, path: &Path, caption: &str) -> Result<(), NotifyError> {
        self.push(SentNotification::Photo {
            path: path.to_path_buf(),
            caption: caption.to_string(),
        })
    }
}

/// Command publisher that records instead of talking to a broker.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    commands: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.set_failing(true);
        publisher
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CommandPublisher for RecordingPublisher {
    async fn publish_command(&self, topic: &str, command: &str) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Internal(anyhow::anyhow!("broker unavailable")));
        }

        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((topic.to_string(), command.to_string()));

        Ok(())
    }
}

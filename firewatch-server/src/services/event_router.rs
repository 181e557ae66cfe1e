use std::sync::Arc;

use anyhow::anyhow;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::configs::{GatewayTopic, Settings, Storage};
use crate::errors::{GatewayError, TransferError};
use crate::models::{CaptureTrigger, CapturedImage, Component, DeviceStatus, LogLevel};
use crate::repositories::{CapturedImageRepository, DeviceStatusRepository};
use crate::services::{
    ActiveAlert, AlertTracker, AlertTransition, CaptureCoordinator, CommandPublisher,
    CompletedImage, EventJournal, FragmentOutcome, FragmentReassembler, ImageMetadata, ImageStore,
    InboundMessage, NotificationDispatcher,
};

pub const DEFAULT_DEVICE: &str = "ESP32-CAM";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    FireDetected,
    Clear,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct AlertPayload {
    pub alert: AlertKind,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub detections: i32,
}

#[derive(Debug, Deserialize)]
pub struct MetadataPayload {
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub chunks: usize,
}

#[derive(Debug, Deserialize)]
pub struct FragmentPayload {
    pub chunk: usize,
    pub total: usize,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: String,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub uptime: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    Alert,
    ImageMeta,
    Image,
    Status,
}

/// Consumes inbound messages one at a time and drives the alert, capture and
/// image pipelines. Owns all of their state.
pub struct EventRouter {
    topic: GatewayTopic,
    tracker: AlertTracker,
    reassembler: FragmentReassembler,
    capture: CaptureCoordinator,
    dispatcher: Arc<NotificationDispatcher>,
    images: ImageStore,
    image_records: CapturedImageRepository,
    devices: DeviceStatusRepository,
    journal: EventJournal,
}

impl EventRouter {
    pub fn new(
        settings: &Settings,
        storage: Arc<Storage>,
        publisher: Arc<dyn CommandPublisher>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        let journal = EventJournal::new(storage.clone());
        let gateway = &settings.gateway;

        Self {
            topic: gateway.topic.clone(),
            tracker: AlertTracker::new(storage.clone(), journal.clone()),
            reassembler: FragmentReassembler::new(settings.images.max_chunks),
            capture: CaptureCoordinator::new(
                publisher,
                &gateway.topic.capture,
                &gateway.capture_command,
            ),
            dispatcher,
            images: ImageStore::new(&settings.images),
            image_records: CapturedImageRepository::new(storage.clone()),
            devices: DeviceStatusRepository::new(storage),
            journal,
        }
    }

    /// Resumes tracking of an alert left open by a previous run.
    pub async fn restore(&mut self) {
        match self.tracker.restore().await {
            Ok(Some(alert)) => {
                let message = format!(
                    "Resumed active alert {}, severity {}",
                    alert.id.unwrap_or_default(),
                    alert.severity
                );
                self.journal
                    .record(LogLevel::Info, Component::Alert, message)
                    .await;
            }
            Ok(None) => debug!("No active alert to resume"),
            Err(e) => {
                self.journal
                    .record(
                        LogLevel::Error,
                        Component::Database,
                        format!("Failed to load active alert: {e}"),
                    )
                    .await;
            }
        }
    }

    pub fn active_alert(&self) -> Option<&ActiveAlert> {
        self.tracker.current()
    }

    pub fn is_capture_requested(&self) -> bool {
        self.capture.is_requested()
    }

    pub fn has_open_transfer(&self) -> bool {
        self.reassembler.is_open()
    }

    /// Handles one message. Failures are journaled, never returned.
    pub async fn handle(&mut self, topic: &str, payload: &[u8]) {
        let Some(route) = self.route(topic) else {
            debug!("Ignoring message on topic {}", topic);
            return;
        };

        let result = match route {
            Route::Alert => self.handle_alert(payload).await,
            Route::ImageMeta => self.handle_image_meta(payload).await,
            Route::Image => self.handle_image(payload).await,
            Route::Status => self.handle_status(payload).await,
        };

        if let Err(e) = result {
            self.report(topic, e).await;
        }
    }

    /// Drains `receiver` until it closes or `shutdown` flips. The message in
    /// hand is always finished before shutdown is observed.
    pub async fn run(
        mut self,
        mut receiver: mpsc::Receiver<InboundMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                message = receiver.recv() => match message {
                    Some(message) => self.handle(&message.topic, &message.payload).await,
                    None => break,
                },
            }
        }

        info!("Event router stopped");
    }

    fn route(&self, topic: &str) -> Option<Route> {
        if topic == self.topic.alert {
            Some(Route::Alert)
        } else if topic == self.topic.image_meta {
            Some(Route::ImageMeta)
        } else if topic == self.topic.image {
            Some(Route::Image)
        } else if topic == self.topic.status {
            Some(Route::Status)
        } else {
            None
        }
    }

    async fn handle_alert(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let payload: AlertPayload = serde_json::from_slice(payload)?;
        let now = OffsetDateTime::now_utc();

        match payload.alert {
            AlertKind::FireDetected => {
                let transition = self
                    .tracker
                    .on_fire_detected(payload.detections, payload.timestamp, now)
                    .await;
                if let AlertTransition::Opened(alert) = transition {
                    self.dispatcher
                        .send_new_alert(alert.detections, alert.created_at, alert.severity)
                        .await;
                }

                if self.capture.request().await? {
                    self.journal
                        .record(LogLevel::Info, Component::Camera, "Capture requested")
                        .await;
                }
            }
            AlertKind::Clear => {
                let transition = self.tracker.on_clear(payload.timestamp, now).await;
                if let AlertTransition::Resolved { duration, .. } = transition {
                    self.dispatcher.send_clear(duration.whole_seconds()).await;
                }

                self.capture.rearm();
            }
            AlertKind::Unknown => debug!("Ignoring unknown alert kind"),
        }

        Ok(())
    }

    async fn handle_image_meta(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let payload: MetadataPayload = serde_json::from_slice(payload)?;
        let metadata = ImageMetadata {
            size: payload.size,
            width: payload.width,
            height: payload.height,
            chunks: payload.chunks,
        };

        let abandoned = self.reassembler.on_metadata(metadata)?;
        if abandoned > 0 {
            self.journal
                .record(
                    LogLevel::Warning,
                    Component::Camera,
                    format!("Abandoned unfinished transfer holding {abandoned} fragments"),
                )
                .await;
        }

        self.journal
            .record(
                LogLevel::Info,
                Component::Camera,
                format!(
                    "Image metadata received: {}x{}, {} bytes in {} chunks",
                    payload.width, payload.height, payload.size, payload.chunks
                ),
            )
            .await;

        Ok(())
    }

    async fn handle_image(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let payload: FragmentPayload = serde_json::from_slice(payload)?;

        match self
            .reassembler
            .on_fragment(payload.chunk, payload.total, payload.data.as_deref())
        {
            Ok(FragmentOutcome::Pending { received, total }) => {
                debug!("Chunk {}/{} stored, {} received", payload.chunk + 1, total, received);
                Ok(())
            }
            Ok(FragmentOutcome::Completed(image)) => {
                let trigger = if self.capture.rearm() {
                    CaptureTrigger::Auto
                } else {
                    CaptureTrigger::Manual
                };
                self.store_image(image, trigger).await
            }
            Err(e @ TransferError::Incomplete { .. }) => {
                self.capture.rearm();
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn store_image(
        &mut self,
        image: CompletedImage,
        trigger: CaptureTrigger,
    ) -> Result<(), GatewayError> {
        if let Some(metadata) = &image.metadata {
            if metadata.size != 0 && metadata.size != image.data.len() {
                self.journal
                    .record(
                        LogLevel::Warning,
                        Component::Camera,
                        format!(
                            "Image size mismatch: announced {} bytes, reassembled {}",
                            metadata.size,
                            image.data.len()
                        ),
                    )
                    .await;
            }
        }

        let captured_at = OffsetDateTime::now_utc();
        let stored = self.images.save(&image.data, captured_at).await?;
        self.journal
            .record(
                LogLevel::Info,
                Component::Camera,
                format!(
                    "Image saved: {} ({}x{}, {} bytes)",
                    stored.file_name, stored.width, stored.height, stored.size
                ),
            )
            .await;

        let active = self.tracker.current().cloned();
        let record = CapturedImage {
            id: 0,
            alert_id: active.as_ref().and_then(|alert| alert.id),
            file_path: stored.file_path.to_string_lossy().to_string(),
            file_name: stored.file_name.clone(),
            image_size: record_column(stored.size, "image size")?,
            width: i32::from(stored.width),
            height: i32::from(stored.height),
            chunks_total: record_column(image.chunks, "fragment count")?,
            capture_trigger: trigger,
            capture_time: captured_at,
        };
        if let Err(e) = self.image_records.create(&record).await {
            self.report(&self.topic.image, e.into()).await;
        }

        if let Some(ActiveAlert {
            id: Some(alert_id),
            severity,
            detections,
            ..
        }) = active
        {
            self.dispatcher
                .send_capture_image(alert_id, severity, detections, &stored.file_path, captured_at)
                .await;
        }

        Ok(())
    }

    async fn handle_status(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let payload: StatusPayload = serde_json::from_slice(payload)?;
        let device_id = payload
            .device
            .unwrap_or_else(|| String::from(DEFAULT_DEVICE));

        self.devices
            .upsert(&DeviceStatus {
                device_id: device_id.clone(),
                status: payload.status.clone(),
                ip_address: payload.ip.clone(),
                uptime_seconds: payload.uptime,
                last_seen: OffsetDateTime::now_utc(),
            })
            .await?;

        if payload.status == "online" {
            info!(
                "{} online at {}",
                device_id,
                payload.ip.as_deref().unwrap_or("unknown address")
            );
        }

        Ok(())
    }

    async fn report(&self, topic: &str, error: GatewayError) {
        let level = error.level();
        let component = match &error {
            GatewayError::Decode(_) | GatewayError::Mqtt(_) => Component::Mqtt,
            GatewayError::Transfer(_) | GatewayError::Image(_) => Component::Camera,
            GatewayError::Storage(_) => Component::Database,
            GatewayError::Notify(_) => Component::Notifier,
            GatewayError::Internal(_) => Component::System,
        };

        match &error {
            GatewayError::Internal(_) => {
                let error_id = Uuid::new_v4();
                self.journal
                    .record_with(
                        level,
                        component,
                        format!("Unexpected failure on {topic}: {error}"),
                        json!({ "error_id": error_id.to_string(), "topic": topic }),
                    )
                    .await;
            }
            _ => {
                self.journal
                    .record(level, component, format!("{topic}: {error}"))
                    .await;
            }
        }
    }
}

/// Converts a host-sized count into its column type without wrapping.
fn record_column<T: TryFrom<usize>>(value: usize, column: &str) -> Result<T, GatewayError> {
    T::try_from(value)
        .map_err(|_| GatewayError::Internal(anyhow!("{column} {value} does not fit the record")))
}

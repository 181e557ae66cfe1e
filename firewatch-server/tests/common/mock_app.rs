use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose;
use serde_json::json;
use tempfile::TempDir;

use firewatch_server::configs::{
    Database, Gateway, GatewayTopic, Images, Logger, Notifier, Settings, Statistics, Storage,
};
use firewatch_server::models::{Alert, CapturedImage, Detection, SystemLog};
use firewatch_server::repositories::{
    AlertRepository, CapturedImageRepository, DetectionRepository, SystemLogRepository,
};
use firewatch_server::services::{EventRouter, ImageStore, NotificationDispatcher};
use firewatch_server::tests::{RecordingChannel, RecordingPublisher, setup_test_db};

pub struct MockApp {
    pub storage: Arc<Storage>,
    pub channel: Arc<RecordingChannel>,
    pub publisher: Arc<RecordingPublisher>,
    pub router: EventRouter,
    pub settings: Settings,
    _workspace: TempDir,
}

impl MockApp {
    pub async fn new() -> Self {
        Self::with_publisher(RecordingPublisher::default()).await
    }

    pub async fn with_publisher(publisher: RecordingPublisher) -> Self {
        let storage = setup_test_db().await;
        Self::with_storage(storage, publisher).await
    }

    pub async fn with_storage(storage: Arc<Storage>, publisher: RecordingPublisher) -> Self {
        let workspace = tempfile::tempdir().unwrap();
        let settings = Self::settings(&workspace);
        ImageStore::new(&settings.images)
            .ensure_directories()
            .await
            .unwrap();

        let channel = Arc::new(RecordingChannel::default());
        let publisher = Arc::new(publisher);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Some(channel.clone()),
            &settings.notifier,
        ));

        let router = EventRouter::new(&settings, storage.clone(), publisher.clone(), dispatcher);

        Self {
            storage,
            channel,
            publisher,
            router,
            settings,
            _workspace: workspace,
        }
    }

    fn settings(workspace: &TempDir) -> Settings {
        Settings {
            logger: Logger {
                level: String::from("debug"),
            },
            gateway: Gateway {
                host: String::from("localhost"),
                port: 1883,
                client_id: String::from("firewatch-test"),
                keep_alive: 60,
                topic: GatewayTopic::default(),
                capture_command: String::from("CAPTURE"),
                auth: None,
            },
            database: Database {
                migration_path: None,
                clean_start: true,
                url: String::from("sqlite::memory:"),
            },
            images: Images {
                directory: workspace.path().join("images").to_string_lossy().to_string(),
                latest_path: workspace
                    .path()
                    .join("public/latest.jpg")
                    .to_string_lossy()
                    .to_string(),
                max_chunks: 64,
            },
            notifier: Notifier {
                enabled: true,
                bot_token: String::from("token"),
                chat_id: String::from("chat"),
                api_base: String::from("http://localhost"),
                send_images: true,
                alert_cooldown: 300,
                timeout: 1,
            },
            statistics: Statistics { interval: 3600 },
        }
    }

    pub fn topic(&self) -> &GatewayTopic {
        &self.settings.gateway.topic
    }

    pub async fn fire(&mut self, detections: i32) {
        let topic = self.topic().alert.clone();
        let payload = json!({"alert": "FIRE_DETECTED", "timestamp": 1000, "detections": detections});
        self.router
            .handle(&topic, payload.to_string().as_bytes())
            .await;
    }

    pub async fn clear(&mut self) {
        let topic = self.topic().alert.clone();
        let payload = json!({"alert": "CLEAR", "timestamp": 2000, "detections": 0});
        self.router
            .handle(&topic, payload.to_string().as_bytes())
            .await;
    }

    pub async fn metadata(&mut self, size: usize, chunks: usize) {
        let topic = self.topic().image_meta.clone();
        let payload = json!({"size": size, "width": 320, "height": 240, "chunks": chunks});
        self.router
            .handle(&topic, payload.to_string().as_bytes())
            .await;
    }

    pub async fn fragment(&mut self, chunk: usize, total: usize, data: Option<&[u8]>) {
        let topic = self.topic().image.clone();
        let data = data.map(|data| general_purpose::STANDARD.encode(data));
        let payload = json!({"chunk": chunk, "total": total, "data": data});
        self.router
            .handle(&topic, payload.to_string().as_bytes())
            .await;
    }

    /// Announces `image` and delivers it in `chunks` pieces, in order.
    pub async fn send_image(&mut self, image: &[u8], chunks: usize) {
        self.metadata(image.len(), chunks).await;

        let size = image.len().div_ceil(chunks);
        let pieces: Vec<&[u8]> = image.chunks(size).collect();
        assert_eq!(pieces.len(), chunks);

        for (index, piece) in pieces.into_iter().enumerate() {
            self.fragment(index, chunks, Some(piece)).await;
        }
    }

    pub async fn status(&mut self, payload: serde_json::Value) {
        let topic = self.topic().status.clone();
        self.router
            .handle(&topic, payload.to_string().as_bytes())
            .await;
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        AlertRepository::new(self.storage.clone())
            .find_all(None, 100)
            .await
            .unwrap()
    }

    pub async fn images(&self) -> Vec<CapturedImage> {
        CapturedImageRepository::new(self.storage.clone())
            .find_recent(100)
            .await
            .unwrap()
    }

    pub async fn detections(&self) -> Vec<Detection> {
        DetectionRepository::new(self.storage.clone())
            .find_recent(100)
            .await
            .unwrap()
    }

    pub async fn logs(&self) -> Vec<SystemLog> {
        SystemLogRepository::new(self.storage.clone())
            .find(None, None, 100)
            .await
            .unwrap()
    }
}

use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::info;

use crate::configs::{Notifier, SchemaManager, Settings, Storage};
use crate::models::{Component, LogLevel};
use crate::services::{
    EventJournal, EventRouter, GatewayService, ImageStore, MqttPublisher, NotificationDispatcher,
    StatisticsService, TelegramChannel,
};

/// Everything the gateway process runs, wired but not started.
pub struct App {
    pub storage: Arc<Storage>,
    pub journal: EventJournal,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub router: EventRouter,
    pub gateway: GatewayService,
    pub publisher: MqttPublisher,
    pub statistics: StatisticsService,
}

pub async fn create_app(settings: &Arc<Settings>) -> anyhow::Result<App> {
    let storage = Arc::new(
        Storage::new(settings.database.clone(), SchemaManager::default())
            .await
            .context("failed to open database")?,
    );
    let journal = EventJournal::new(storage.clone());

    ImageStore::new(&settings.images)
        .ensure_directories()
        .await
        .context("failed to create image directories")?;
    journal
        .record(LogLevel::Info, Component::System, "Image directories ready")
        .await;

    let dispatcher = Arc::new(create_dispatcher(&settings.notifier, &journal).await);

    let gateway = GatewayService::new(&settings.gateway, journal.clone())
        .map_err(|e| anyhow!("failed to configure broker connection: {e}"))?;
    let publisher = gateway.publisher();

    let router = EventRouter::new(
        settings,
        storage.clone(),
        Arc::new(publisher.clone()),
        dispatcher.clone(),
    );
    let statistics = StatisticsService::new(storage.clone(), dispatcher.clone(), journal.clone());

    Ok(App {
        storage,
        journal,
        dispatcher,
        router,
        gateway,
        publisher,
        statistics,
    })
}

async fn create_dispatcher(notifier: &Notifier, journal: &EventJournal) -> NotificationDispatcher {
    if !notifier.is_configured() {
        info!("Notifications disabled, bot token or chat id missing");
        return NotificationDispatcher::disabled();
    }

    let channel = match TelegramChannel::new(notifier) {
        Ok(channel) => channel,
        Err(e) => {
            journal
                .record(
                    LogLevel::Warning,
                    Component::Notifier,
                    format!("Failed to build notification client: {e}"),
                )
                .await;
            return NotificationDispatcher::disabled();
        }
    };

    match channel.verify().await {
        Ok(username) => {
            journal
                .record(
                    LogLevel::Info,
                    Component::Notifier,
                    format!("Notification bot @{username} ready"),
                )
                .await
        }
        Err(e) => {
            journal
                .record(
                    LogLevel::Warning,
                    Component::Notifier,
                    format!("Notification bot verification failed: {e}"),
                )
                .await
        }
    }

    NotificationDispatcher::new(Some(Arc::new(channel)), notifier)
}

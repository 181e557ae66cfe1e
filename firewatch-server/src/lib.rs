use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::app::{App, create_app};
use crate::configs::Settings;
use crate::models::{Component, LogLevel};
use crate::services::SystemState;

pub mod app;
pub mod configs;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;

#[cfg(any(test, feature = "mock"))]
pub mod tests;

const INBOUND_CAPACITY: usize = 100;

pub async fn run(settings: &Arc<Settings>) -> anyhow::Result<()> {
    let App {
        storage,
        journal,
        dispatcher,
        mut router,
        gateway,
        publisher,
        statistics,
    } = create_app(settings).await?;

    match statistics.refresh_today().await {
        Ok(today) => info!(
            "Today so far: {} detections, {} alerts, {} images",
            today.total_detections, today.total_alerts, today.images_captured
        ),
        Err(e) => warn!("Failed to load today's statistics: {}", e),
    }

    router.restore().await;

    let (sender, receiver) = mpsc::channel(INBOUND_CAPACITY);
    let (shutdown_sender, shutdown_receiver) = watch::channel(false);

    let transport = gateway.spawn(sender);
    let maintenance = statistics.clone().spawn(
        Duration::from_secs(settings.statistics.interval),
        shutdown_receiver.clone(),
    );
    let router = tokio::spawn(router.run(receiver, shutdown_receiver));

    let broker = format!("Broker: {}:{}", settings.gateway.host, settings.gateway.port);
    dispatcher
        .send_system_status(SystemState::Online, Some(&broker))
        .await;
    journal
        .record(LogLevel::Info, Component::System, "Fire monitor started")
        .await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested");

    let _ = shutdown_sender.send(true);
    router.await?;
    maintenance.await?;

    let details = match statistics.refresh_today().await {
        Ok(today) => Some(format!(
            "Detections: {} | Alerts: {} | Images: {}",
            today.total_detections, today.total_alerts, today.images_captured
        )),
        Err(e) => {
            warn!("Failed to refresh statistics on shutdown: {}", e);
            None
        }
    };
    dispatcher
        .send_system_status(SystemState::Offline, details.as_deref())
        .await;
    journal
        .record(LogLevel::Info, Component::System, "Fire monitor stopped")
        .await;

    if let Err(e) = publisher.disconnect().await {
        warn!("Failed to disconnect from broker: {}", e);
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    transport.abort();
    storage.close().await;

    Ok(())
}

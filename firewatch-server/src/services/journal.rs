use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::configs::Storage;
use crate::models::{Component, LogLevel};
use crate::repositories::SystemLogRepository;

/// Writes notable events to `system_logs` and mirrors them to tracing.
#[derive(Clone)]
pub struct EventJournal {
    logs: SystemLogRepository,
}

impl EventJournal {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            logs: SystemLogRepository::new(storage),
        }
    }

    pub async fn record(&self, level: LogLevel, component: Component, message: impl AsRef<str>) {
        self.write(level, component, message.as_ref(), None).await;
    }

    pub async fn record_with(
        &self,
        level: LogLevel,
        component: Component,
        message: impl AsRef<str>,
        details: Value,
    ) {
        self.write(level, component, message.as_ref(), Some(details))
            .await;
    }

    async fn write(
        &self,
        level: LogLevel,
        component: Component,
        message: &str,
        details: Option<Value>,
    ) {
        match level {
            LogLevel::Debug => debug!(%component, "{message}"),
            LogLevel::Info => info!(%component, "{message}"),
            LogLevel::Warning => warn!(%component, "{message}"),
            LogLevel::Error | LogLevel::Critical => error!(%component, %level, "{message}"),
        }

        if let Err(e) = self
            .logs
            .create(level, component, message, details.as_ref())
            .await
        {
            error!("Failed to persist journal entry: {}", e);
        }
    }
}

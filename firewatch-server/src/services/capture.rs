use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::GatewayError;

/// Outbound side of the transport, used to command the camera.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish_command(&self, topic: &str, command: &str) -> Result<(), GatewayError>;
}

/// Keeps at most one capture command outstanding.
pub struct CaptureCoordinator {
    publisher: Arc<dyn CommandPublisher>,
    topic: String,
    command: String,
    requested: bool,
}

impl CaptureCoordinator {
    pub fn new(publisher: Arc<dyn CommandPublisher>, topic: &str, command: &str) -> Self {
        Self {
            publisher,
            topic: topic.to_string(),
            command: command.to_string(),
            requested: false,
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Publishes the capture command unless one is already outstanding.
    /// Returns whether a command went out. A failed publish leaves the coordinator armed.
    pub async fn request(&mut self) -> Result<bool, GatewayError> {
        if self.requested {
            return Ok(false);
        }

        self.publisher
            .publish_command(&self.topic, &self.command)
            .await?;
        self.requested = true;

        Ok(true)
    }

    /// Allows the next request through and reports whether one was outstanding.
    pub fn rearm(&mut self) -> bool {
        std::mem::replace(&mut self.requested, false)
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::*;

    use super::*;

    #[tokio::test]
    async fn test_request_is_debounced_until_rearmed() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut capture = CaptureCoordinator::new(publisher.clone(), "fire/capture", "CAPTURE");

        assert!(capture.request().await.unwrap());
        assert!(!capture.request().await.unwrap());
        assert_eq!(publisher.commands(), vec![(String::from("fire/capture"), String::from("CAPTURE"))]);

        assert!(capture.rearm());
        assert!(!capture.rearm());

        assert!(capture.request().await.unwrap());
        assert_eq!(publisher.commands().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_publish_stays_armed() {
        let publisher = Arc::new(RecordingPublisher::failing());
        let mut capture = CaptureCoordinator::new(publisher.clone(), "fire/capture", "CAPTURE");

        assert!(capture.request().await.is_err());
        assert!(!capture.is_requested());

        publisher.set_failing(false);
        assert!(capture.request().await.unwrap());
        assert!(capture.is_requested());
    }
}

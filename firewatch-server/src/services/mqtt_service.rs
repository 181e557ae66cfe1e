use std::{error, fs, io, time};

use async_trait::async_trait;
use rumqttc::tokio_rustls::rustls::pki_types::CertificateDer;
use rumqttc::tokio_rustls::rustls::{ClientConfig, RootCertStore};
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use rustls_pemfile::{certs, private_key};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::configs::{Gateway, GatewayAuth, GatewayTopic};
use crate::errors::GatewayError;
use crate::models::{Component, LogLevel};
use crate::services::{CommandPublisher, EventJournal};

/// Image fragments are far larger than the rumqttc default packet limit.
const MAX_PACKET_SIZE: usize = 256 * 1024;
const RECONNECT_DELAY: time::Duration = time::Duration::from_secs(5);

/// One publish received from the broker.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Owns the broker connection and forwards inbound publishes to the router.
pub struct GatewayService {
    client: AsyncClient,
    event_loop: EventLoop,
    topic: GatewayTopic,
    journal: EventJournal,
}

impl GatewayService {
    pub fn new(
        gateway: &Gateway,
        journal: EventJournal,
    ) -> Result<Self, Box<dyn error::Error + Send + Sync>> {
        let mut options = MqttOptions::new(&gateway.client_id, &gateway.host, gateway.port);
        options.set_keep_alive(time::Duration::from_secs(gateway.keep_alive));
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        if let Some(auth) = &gateway.auth {
            options.set_transport(Transport::Tls(Self::tls_configuration(auth)?));
        }

        let (client, event_loop) = AsyncClient::new(options, 10);

        Ok(Self {
            client,
            event_loop,
            topic: gateway.topic.clone(),
            journal,
        })
    }

    /// Mutual TLS with the platform roots plus the configured client identity.
    fn tls_configuration(
        auth: &GatewayAuth,
    ) -> Result<TlsConfiguration, Box<dyn error::Error + Send + Sync>> {
        let native = rustls_native_certs::load_native_certs();
        for e in &native.errors {
            debug!("Skipping unreadable platform certificate: {}", e);
        }
        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        debug!("Loaded {} platform roots, ignored {}", added, ignored);

        let identity = Self::client_certificates(&auth.cert_path)?;
        let key = private_key(&mut io::BufReader::new(fs::File::open(&auth.key_path)?))?
            .ok_or_else(|| format!("no unencrypted private key in {}", auth.key_path))?;

        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_client_auth_cert(identity, key)?;

        Ok(TlsConfiguration::from(config))
    }

    fn client_certificates(
        path: &str,
    ) -> Result<Vec<CertificateDer<'static>>, Box<dyn error::Error + Send + Sync>> {
        let chain = certs(&mut io::BufReader::new(fs::File::open(path)?))
            .collect::<Result<Vec<_>, _>>()?;
        if chain.is_empty() {
            return Err(format!("no certificate found in {path}").into());
        }

        Ok(chain)
    }

    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher {
            client: self.client.clone(),
        }
    }

    pub fn inbound_topics(&self) -> [&str; 4] {
        [
            self.topic.alert.as_str(),
            self.topic.image.as_str(),
            self.topic.image_meta.as_str(),
            self.topic.status.as_str(),
        ]
    }

    /// Polls the event loop on its own task. Subscriptions are renewed on
    /// every connection acknowledgement so a reconnect resumes intake.
    pub fn spawn(mut self, sender: Sender<InboundMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        self.journal
                            .record(LogLevel::Info, Component::Mqtt, "Connected to broker")
                            .await;
                        self.subscribe_all();
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = InboundMessage {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        };
                        if sender.send(message).await.is_err() {
                            debug!("Inbound channel closed, stopping event loop");
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.journal
                            .record(
                                LogLevel::Warning,
                                Component::Mqtt,
                                format!("Broker connection error: {e}"),
                            )
                            .await;
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        })
    }

    fn subscribe_all(&self) {
        for target in self.inbound_topics() {
            // The event loop drains requests, so never wait on the request queue here
            match self.client.try_subscribe(target, QoS::AtLeastOnce) {
                Ok(()) => debug!("subscribe topic {}", target),
                Err(e) => error!("Failed to subscribe {}: {}", target, e),
            }
        }

        info!("Subscribed to {}", self.inbound_topics().join(", "));
    }
}

#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub async fn disconnect(&self) -> Result<(), GatewayError> {
        self.client.disconnect().await?;

        Ok(())
    }
}

#[async_trait]
impl CommandPublisher for MqttPublisher {
    async fn publish_command(&self, topic: &str, command: &str) -> Result<(), GatewayError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, command.as_bytes().to_vec())
            .await?;

        Ok(())
    }
}

//! Downstream publish collaborator for aggregated telemetry.
//!
//! The relay path is intentionally lossy (the storage path is the durable
//! one), so the publisher uses QoS 0 and failures are reported to the
//! relay, which logs and drops the aggregate.

use async_trait::async_trait;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sungate_protocol::DataPoint;

use crate::config::MqttConfig;

/// Publish failure, non-fatal for the relay.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("mqtt client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The downstream collaborator rejected or cannot take the record.
    #[error("publisher unavailable: {0}")]
    Unavailable(String),
}

/// Sink for one aggregated record per device per window.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, point: &DataPoint) -> Result<(), PublishError>;
}

/// MQTT-backed publisher. Encodes each aggregate as the 36-byte wire
/// record so downstream consumers reuse the device codec.
pub struct MqttPublisher {
    client: AsyncClient,
    topic: String,
}

impl MqttPublisher {
    /// Connect to the broker and spawn the event-loop driver task.
    ///
    /// rumqttc reconnects on its own as long as the event loop keeps
    /// being polled; connection errors are logged, not propagated.
    pub fn connect(config: &MqttConfig) -> (Self, JoinHandle<()>) {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(std::time::Duration::from_secs(30));

        let (client, mut eventloop) = AsyncClient::new(options, 16);
        info!(host = %config.host, port = config.port, "connecting to MQTT broker");

        let driver = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(event) => debug!(?event, "mqtt event"),
                    Err(err) => {
                        warn!("mqtt connection error: {err}");
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        });

        let publisher = Self {
            client,
            topic: config.topic.clone(),
        };
        (publisher, driver)
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, point: &DataPoint) -> Result<(), PublishError> {
        self.client
            .publish(self.topic.clone(), QoS::AtMostOnce, false, point.encode().to_vec())
            .await?;
        Ok(())
    }
}

//! AMQP publisher for replies to the game server

use crate::amqp::messages::{MessageEnvelope, BROADCAST_ROUTING_KEY, WARN_ROUTING_KEY};
use crate::command::MessageSink;
use crate::error::{BalanceError, Result};
use crate::metrics::MetricsCollector;
use crate::types::{RconBroadcast, RconWarn};
use amqprs::{
    channel::{BasicPublishArguments, Channel, ExchangeDeclareArguments},
    BasicProperties,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Publishes broadcast and warn requests to the rcon exchange
///
/// Each message is published once; failures are returned to the caller.
pub struct AmqpMessageSink {
    channel: Channel,
    exchange: String,
    metrics: Option<Arc<MetricsCollector>>,
}

impl AmqpMessageSink {
    /// Create a new sink and declare its exchange
    pub async fn new(channel: Channel, exchange: &str) -> Result<Self> {
        let sink = Self {
            channel,
            exchange: exchange.to_string(),
            metrics: None,
        };

        sink.setup_exchange().await?;

        Ok(sink)
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn setup_exchange(&self) -> Result<()> {
        let args = ExchangeDeclareArguments::new(&self.exchange, "topic");
        self.channel.exchange_declare(args).await.map_err(|e| {
            BalanceError::AmqpConnectionFailed {
                message: format!("Failed to declare exchange {}: {}", self.exchange, e),
            }
        })?;

        info!("Declared rcon exchange '{}'", self.exchange);
        Ok(())
    }

    async fn publish<T>(&self, envelope: &MessageEnvelope<T>) -> Result<()>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let start = Instant::now();
        let payload = envelope.to_bytes()?;

        let args = BasicPublishArguments::new(&self.exchange, &envelope.routing_key);
        let mut properties = BasicProperties::default();
        properties
            .with_message_id(&envelope.correlation_id)
            .with_correlation_id(&envelope.correlation_id)
            .with_timestamp(envelope.timestamp.timestamp() as u64)
            .with_content_type("application/json");

        let result = self
            .channel
            .basic_publish(properties, payload, args)
            .await
            .map_err(|e| BalanceError::DeliveryFailed {
                message: format!(
                    "Failed to publish {} to {}: {}",
                    envelope.routing_key, self.exchange, e
                ),
            });

        if let Some(metrics) = &self.metrics {
            metrics.record_amqp_operation("publish", result.is_ok(), start.elapsed());
        }

        result?;
        debug!(
            "Published {} (correlation_id: {})",
            envelope.routing_key, envelope.correlation_id
        );
        Ok(())
    }
}

#[async_trait]
impl MessageSink for AmqpMessageSink {
    async fn broadcast(&self, text: &str) -> Result<()> {
        let envelope = MessageEnvelope::new(
            RconBroadcast {
                text: text.to_string(),
            },
            BROADCAST_ROUTING_KEY.to_string(),
        );
        self.publish(&envelope).await
    }

    async fn warn(&self, player_id: &str, text: &str) -> Result<()> {
        let envelope = MessageEnvelope::new(
            RconWarn {
                player_id: player_id.to_string(),
                text: text.to_string(),
            },
            WARN_ROUTING_KEY.to_string(),
        );
        self.publish(&envelope).await
    }
}

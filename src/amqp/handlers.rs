//! AMQP consumer for chat commands
//!
//! Every delivery is decoded into a [`ChatCommand`] and passed to a
//! [`MessageHandler`]. Deliveries are acknowledged once handled, including
//! malformed ones, so a bad payload is never redelivered.

use crate::amqp::messages::MessageUtils;
use crate::error::{BalanceError, Result};
use crate::metrics::MetricsCollector;
use crate::types::ChatCommand;
use amqprs::{
    channel::{BasicAckArguments, BasicCancelArguments, BasicConsumeArguments, Channel},
    consumer::AsyncConsumer,
    BasicProperties, Deliver,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Trait defining the interface for handling AMQP messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle a chat command forwarded by the game server
    async fn handle_chat_command(&self, command: ChatCommand) -> Result<()>;

    /// Handle processing errors
    async fn handle_error(&self, error: BalanceError, message_data: &[u8]);
}

/// Consumer for the chat command queue
pub struct ChatCommandConsumer {
    handler: Arc<dyn MessageHandler>,
    channel: Channel,
    consumer_tag: String,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ChatCommandConsumer {
    /// Create a new chat command consumer
    pub fn new(handler: Arc<dyn MessageHandler>, channel: Channel) -> Self {
        let consumer_tag = format!("balance-consumer-{}", uuid::Uuid::new_v4());

        Self {
            handler,
            channel,
            consumer_tag,
            metrics: None,
        }
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Start consuming messages from the queue
    pub async fn start_consuming(&self, queue_name: &str) -> Result<()> {
        let args = BasicConsumeArguments::new(queue_name, &self.consumer_tag);

        let consumer = CommandConsumer {
            handler: self.handler.clone(),
            metrics: self.metrics.clone(),
        };

        self.channel
            .basic_consume(consumer, args)
            .await
            .map_err(|e| BalanceError::AmqpConnectionFailed {
                message: format!("Failed to start consuming: {}", e),
            })?;

        info!("Started consuming messages from queue: {}", queue_name);
        Ok(())
    }

    /// Stop consuming messages
    pub async fn stop_consuming(&self) -> Result<()> {
        let args = BasicCancelArguments::new(&self.consumer_tag);

        self.channel
            .basic_cancel(args)
            .await
            .map_err(|e| BalanceError::AmqpConnectionFailed {
                message: format!("Failed to stop consuming: {}", e),
            })?;

        info!("Stopped consuming messages");
        Ok(())
    }
}

/// Internal consumer implementation
struct CommandConsumer {
    handler: Arc<dyn MessageHandler>,
    metrics: Option<Arc<MetricsCollector>>,
}

#[async_trait]
impl AsyncConsumer for CommandConsumer {
    async fn consume(
        &mut self,
        channel: &Channel,
        deliver: Deliver,
        _basic_properties: BasicProperties,
        content: Vec<u8>,
    ) {
        let delivery_tag = deliver.delivery_tag();

        debug!(
            "AMQP message received - delivery_tag: {}, routing_key: '{}', size: {} bytes",
            delivery_tag,
            deliver.routing_key(),
            content.len()
        );

        // A slow playtime lookup must not hold up the next delivery
        let handler = self.handler.clone();
        let metrics = self.metrics.clone();
        let channel = channel.clone();
        tokio::spawn(async move {
            handle_delivery(handler, metrics, delivery_tag, content).await;

            let args = BasicAckArguments::new(delivery_tag, false);
            if let Err(e) = channel.basic_ack(args).await {
                warn!("Failed to ack delivery {}: {}", delivery_tag, e);
            }
        });
    }
}

/// Process one delivery to completion, reporting failures to the handler
pub async fn handle_delivery(
    handler: Arc<dyn MessageHandler>,
    metrics: Option<Arc<MetricsCollector>>,
    delivery_tag: u64,
    content: Vec<u8>,
) {
    let start_time = Instant::now();
    let result = process_message(handler.as_ref(), &content).await;
    let processing_time = start_time.elapsed();

    if let Some(metrics) = &metrics {
        metrics.record_amqp_operation("consume", result.is_ok(), processing_time);
    }

    match result {
        Ok(()) => {
            debug!(
                "Message processed - delivery_tag: {}, processing_time: {:.2}ms",
                delivery_tag,
                processing_time.as_secs_f64() * 1000.0
            );
        }
        Err(e) => {
            error!(
                "Message processing failed - delivery_tag: {}, error: {}",
                delivery_tag, e
            );
            let error = match e.downcast::<BalanceError>() {
                Ok(error) => error,
                Err(e) => BalanceError::InternalError {
                    message: e.to_string(),
                },
            };
            handler.handle_error(error, &content).await;
        }
    }
}

/// Decode one delivery and hand it to the handler
pub async fn process_message(handler: &dyn MessageHandler, content: &[u8]) -> Result<()> {
    let command = MessageUtils::deserialize_chat_command(content)?;

    debug!(
        "Chat command parsed - command: '{}', requester: '{}', roster: {} players",
        command.command,
        command.player.id,
        command.players.len()
    );

    handler.handle_chat_command(command).await
}

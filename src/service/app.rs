//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the playtime
//! source, command table and AMQP transport together and manages background
//! tasks.

use crate::amqp::connection::{AmqpConfig, AmqpConnection};
use crate::amqp::handlers::{ChatCommandConsumer, MessageHandler};
use crate::amqp::publisher::AmqpMessageSink;
use crate::balance::BalanceAggregator;
use crate::command::{BalanceCommandHandler, CommandTable};
use crate::config::AppConfig;
use crate::error::{BalanceError, Result as BalanceResult};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::playtime::source_from_settings;
use crate::service::health::{HealthCheck, HealthProbe, HealthStatus};
use crate::types::ChatCommand;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("AMQP connection error: {message}")]
    AmqpConnection { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Production message handler that forwards chat commands to the balance handler
struct ProductionMessageHandler {
    handler: Arc<BalanceCommandHandler>,
}

impl ProductionMessageHandler {
    fn new(handler: Arc<BalanceCommandHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl MessageHandler for ProductionMessageHandler {
    async fn handle_chat_command(&self, command: ChatCommand) -> BalanceResult<()> {
        let start_time = std::time::Instant::now();

        match self.handler.handle(&command).await {
            Some(message) => debug!(
                "Chat command answered - command: '{}', requester: '{}', outcome: {}, time: {:.2}ms",
                command.command,
                command.player.id,
                message.outcome.as_str(),
                start_time.elapsed().as_secs_f64() * 1000.0
            ),
            None => debug!(
                "Chat command skipped - command: '{}', requester: '{}'",
                command.command, command.player.id
            ),
        }

        Ok(())
    }

    async fn handle_error(&self, error: BalanceError, message_data: &[u8]) {
        match &error {
            BalanceError::InvalidChatCommand { .. } => warn!(
                "Dropping malformed chat command - error: '{}', message_size: {} bytes",
                error,
                message_data.len()
            ),
            _ => error!(
                "Production message handler error - type: '{}', message_size: {} bytes",
                error,
                message_data.len()
            ),
        }

        if !message_data.is_empty() {
            let preview_len = std::cmp::min(100, message_data.len());
            let preview = String::from_utf8_lossy(&message_data[..preview_len]);
            debug!("Message preview: {:?}", preview);
        }
    }
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Balance command handler shared with the consumer
    handler: Arc<BalanceCommandHandler>,

    /// AMQP connection for message handling
    amqp_connection: Arc<AmqpConnection>,

    /// Metrics service for monitoring and health checks
    metrics_service: Arc<MetricsService>,

    /// Live status reported by the health endpoints
    probe: Arc<HealthProbe>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// AMQP consumer for chat commands
    command_consumer: Option<ChatCommandConsumer>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing playtime balance service");
        info!(
            "Configuration: service={}, amqp_url={}, provider={}, balances={}",
            config.service.name,
            config.amqp.url,
            config.playtime.provider,
            config.balances.len()
        );

        let table = Arc::new(CommandTable::from_config(&config.balances).map_err(|e| {
            ServiceError::Configuration {
                message: format!("Invalid balance rules: {}", e),
            }
        })?);

        let probe = Arc::new(HealthProbe::new(
            config.service.name.clone(),
            config.playtime.provider.to_string(),
            table.len(),
        ));

        // Initialize metrics service
        let metrics_service = Self::initialize_metrics(&config, probe.clone())?;

        // Initialize AMQP connection
        let amqp_connection = Self::initialize_amqp(&config).await?;
        probe.set_amqp_connected(amqp_connection.is_alive());

        let handler = Self::initialize_balance_system(
            &config,
            table,
            amqp_connection.clone(),
            metrics_service.collector(),
        )
        .await?;

        Ok(Self {
            config,
            handler,
            amqp_connection,
            metrics_service,
            probe,
            background_tasks: Vec::new(),
            command_consumer: None,
        })
    }

    /// Start all background services and message consumption
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting playtime balance service");

        self.probe.set_running(true);

        // Start metrics service first
        self.start_metrics_service().await?;

        // Start AMQP message consumption
        self.start_amqp_consumption().await?;

        // Start background tasks
        self.start_background_tasks().await?;

        info!("✅ Playtime balance service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of playtime balance service");

        self.probe.set_running(false);

        // Stop AMQP message consumption
        if let Some(consumer) = self.command_consumer.take() {
            if let Err(e) = consumer.stop_consuming().await {
                warn!("Failed to stop AMQP consumer: {}", e);
            } else {
                info!("✅ AMQP message consumption stopped");
            }
        }
        self.probe.set_amqp_connected(false);

        // Stop background tasks (including metrics service task)
        self.stop_background_tasks().await;

        info!("Stopping metrics service...");
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        } else {
            info!("✅ Metrics service stopped");
        }

        let status = HealthCheck::check(&self.probe);
        info!(
            "Final service status: {}, uptime: {}s",
            status.status, status.uptime_seconds
        );
        info!("✅ Playtime balance service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub fn is_running(&self) -> bool {
        self.probe.is_running()
    }

    /// Get the balance command handler
    pub fn handler(&self) -> Arc<BalanceCommandHandler> {
        self.handler.clone()
    }

    /// Get metrics service
    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    /// Initialize metrics service
    fn initialize_metrics(
        config: &AppConfig,
        probe: Arc<HealthProbe>,
    ) -> Result<Arc<MetricsService>, ServiceError> {
        info!(
            "Initializing metrics service on port {}",
            config.service.health_port
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let health_config = HealthServerConfig {
            port: config.service.health_port,
            host: "0.0.0.0".to_string(),
        };

        let health_server = Arc::new(
            HealthServer::new(health_config, metrics_collector.clone()).with_probe(probe),
        );

        Ok(Arc::new(MetricsService::new(
            metrics_collector,
            health_server,
        )))
    }

    /// Start metrics service
    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        info!("Starting metrics and health endpoints");

        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.health_port;

        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });

        self.background_tasks.push(metrics_handle);

        // Give the server a moment to start up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    /// Initialize AMQP connection with retry logic
    async fn initialize_amqp(config: &AppConfig) -> Result<Arc<AmqpConnection>, ServiceError> {
        info!("Connecting to AMQP broker: {}", config.amqp.url);

        let amqp_config =
            AmqpConfig::from_settings(&config.amqp).map_err(|e| ServiceError::Configuration {
                message: format!("Failed to parse AMQP URL: {}", e),
            })?;

        let connection =
            AmqpConnection::new(amqp_config)
                .await
                .map_err(|e| ServiceError::AmqpConnection {
                    message: format!("Failed to connect to AMQP: {}", e),
                })?;

        Ok(Arc::new(connection))
    }

    /// Build the playtime source, aggregator, reply sink and command handler
    async fn initialize_balance_system(
        config: &AppConfig,
        table: Arc<CommandTable>,
        amqp_connection: Arc<AmqpConnection>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Arc<BalanceCommandHandler>, ServiceError> {
        info!("Initializing balance components");

        let source =
            source_from_settings(&config.playtime).map_err(|e| ServiceError::Initialization {
                message: format!("Failed to initialize playtime source: {}", e),
            })?;
        let aggregator = BalanceAggregator::new(source).with_metrics(metrics_collector.clone());

        let channel =
            amqp_connection
                .open_channel()
                .await
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to open AMQP channel: {}", e),
                })?;

        let sink = AmqpMessageSink::new(channel, &config.amqp.rcon_exchange)
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to initialize rcon publisher: {}", e),
            })?
            .with_metrics(metrics_collector.clone());

        for (rule, triggers) in table.bindings() {
            info!("Balance '{}' bound to {:?}", rule.name, triggers);
        }

        let handler = BalanceCommandHandler::new(table, aggregator, Arc::new(sink))
            .with_metrics(metrics_collector);

        Ok(Arc::new(handler))
    }

    /// Start AMQP message consumption
    async fn start_amqp_consumption(&mut self) -> Result<(), ServiceError> {
        info!("Starting AMQP message consumption system...");

        let queue = self.config.amqp.command_queue.clone();

        let channel =
            self.amqp_connection
                .open_channel()
                .await
                .map_err(|e| ServiceError::AmqpConnection {
                    message: format!("Failed to open consumer channel: {}", e),
                })?;

        info!("Declaring queue: '{}'...", queue);
        let queue_declare_args = amqprs::channel::QueueDeclareArguments::new(&queue)
            .durable(true)
            .auto_delete(false)
            .finish();

        channel
            .queue_declare(queue_declare_args)
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: format!("Failed to declare queue {}: {}", queue, e),
            })?;

        let message_handler = Arc::new(ProductionMessageHandler::new(self.handler.clone()));
        let consumer = ChatCommandConsumer::new(message_handler, channel)
            .with_metrics(self.metrics_service.collector());

        consumer
            .start_consuming(&queue)
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: format!("Failed to start consuming messages: {}", e),
            })?;

        self.command_consumer = Some(consumer);
        self.probe.set_amqp_connected(true);

        info!(
            "AMQP message consumption started successfully on queue: '{}'",
            queue
        );
        info!("Now listening for balance chat commands...");
        Ok(())
    }

    /// Start background maintenance tasks
    async fn start_background_tasks(&mut self) -> Result<(), ServiceError> {
        info!("Starting health metrics update task (30s interval)...");

        let health_task = {
            let amqp_connection = self.amqp_connection.clone();
            let metrics_collector = self.metrics_service.collector();
            let probe = self.probe.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(30));
                info!("Health metrics task started");

                while probe.is_running() {
                    interval.tick().await;

                    let alive = amqp_connection.is_alive();
                    if !alive && probe.is_amqp_connected() {
                        warn!("AMQP connection lost");
                    }
                    probe.set_amqp_connected(alive);

                    let check = HealthCheck::check(&probe);
                    let status = match check.status {
                        HealthStatus::Healthy => 2,
                        HealthStatus::Degraded => 1,
                        HealthStatus::Unhealthy => 0,
                    };

                    metrics_collector
                        .service()
                        .uptime_seconds
                        .set(check.uptime_seconds as i64);
                    metrics_collector.update_health_status(status);
                    for component in &check.checks {
                        metrics_collector.update_component_health(
                            &component.name,
                            component.status != HealthStatus::Unhealthy,
                        );
                    }

                    debug!(
                        "Health metrics updated - status: {}, uptime: {}s",
                        check.status, check.uptime_seconds
                    );
                }

                info!("Health metrics task stopped");
            })
        };

        self.background_tasks.push(health_task);

        info!(
            "✅ Started {} background tasks",
            self.background_tasks.len()
        );
        Ok(())
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        info!(
            "Stopping {} background tasks...",
            self.background_tasks.len()
        );

        for task in self.background_tasks.drain(..) {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Background task failed during shutdown: {}", e);
                }
            }
        }

        info!("✅ All background tasks stopped");
    }
}

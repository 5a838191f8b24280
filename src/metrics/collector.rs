//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the playtime balance service
//! using Prometheus metrics.

use crate::types::{Delivery, ReportOutcome};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the balance service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Chat command and report metrics
    command_metrics: CommandMetrics,

    /// Playtime source metrics
    playtime_metrics: PlaytimeMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Total AMQP messages processed
    pub amqp_messages_total: IntCounterVec,

    /// AMQP message processing errors
    pub amqp_errors_total: IntCounterVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Chat command metrics
#[derive(Clone)]
pub struct CommandMetrics {
    /// Balance commands handled, by rule name
    pub commands_total: IntCounterVec,

    /// Reports produced, by outcome
    pub reports_total: IntCounterVec,

    /// Report deliveries, by channel and status
    pub deliveries_total: IntCounterVec,
}

/// Playtime source metrics
#[derive(Clone)]
pub struct PlaytimeMetrics {
    /// Source calls issued, by source shape
    pub lookups_total: IntCounterVec,

    /// Sides that resolved to unknown because the source failed
    pub source_failures_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// End-to-end chat command processing time
    pub command_processing_duration: Histogram,

    /// Time spent aggregating one side
    pub aggregation_duration: HistogramVec,

    /// AMQP operation durations
    pub amqp_operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let command_metrics = CommandMetrics::new(&registry)?;
        let playtime_metrics = PlaytimeMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            command_metrics,
            playtime_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get command metrics
    pub fn commands(&self) -> &CommandMetrics {
        &self.command_metrics
    }

    /// Get playtime source metrics
    pub fn playtime(&self) -> &PlaytimeMetrics {
        &self.playtime_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a handled balance command
    pub fn record_command(&self, rule: &str, outcome: ReportOutcome, duration: Duration) {
        self.command_metrics
            .commands_total
            .with_label_values(&[rule])
            .inc();

        self.command_metrics
            .reports_total
            .with_label_values(&[outcome.as_str()])
            .inc();

        self.performance_metrics
            .command_processing_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a report delivery attempt
    pub fn record_delivery(&self, delivery: Delivery, success: bool) {
        let channel = match delivery {
            Delivery::Broadcast => "broadcast",
            Delivery::Requester => "warn",
        };
        let status = if success { "success" } else { "failed" };

        self.command_metrics
            .deliveries_total
            .with_label_values(&[channel, status])
            .inc();
    }

    /// Record source calls issued for one side
    pub fn record_lookups(&self, shape: &str, count: usize) {
        self.playtime_metrics
            .lookups_total
            .with_label_values(&[shape])
            .inc_by(count as u64);
    }

    /// Record a side that failed to aggregate
    pub fn record_source_failure(&self, shape: &str) {
        self.playtime_metrics
            .source_failures_total
            .with_label_values(&[shape])
            .inc();
    }

    /// Record the time spent aggregating one side
    pub fn record_aggregation(&self, shape: &str, duration: Duration) {
        self.performance_metrics
            .aggregation_duration
            .with_label_values(&[shape])
            .observe(duration.as_secs_f64());
    }

    /// Record AMQP operation
    pub fn record_amqp_operation(&self, operation: &str, success: bool, duration: Duration) {
        let status = if success { "success" } else { "error" };

        self.service_metrics
            .amqp_messages_total
            .with_label_values(&[operation, status])
            .inc();

        if !success {
            self.service_metrics
                .amqp_errors_total
                .with_label_values(&[operation])
                .inc();
        }

        self.performance_metrics
            .amqp_operation_duration
            .with_label_values(&[operation, status])
            .observe(duration.as_secs_f64());
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("playtime_balance_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let amqp_messages_total = IntCounterVec::new(
            Opts::new(
                "playtime_balance_amqp_messages_total",
                "Total AMQP messages processed",
            ),
            &["operation", "status"],
        )?;
        registry.register(Box::new(amqp_messages_total.clone()))?;

        let amqp_errors_total = IntCounterVec::new(
            Opts::new("playtime_balance_amqp_errors_total", "Total AMQP errors"),
            &["operation"],
        )?;
        registry.register(Box::new(amqp_errors_total.clone()))?;

        let health_status = IntGauge::new(
            "playtime_balance_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new(
                "playtime_balance_component_health",
                "Component health status",
            ),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            amqp_messages_total,
            amqp_errors_total,
            health_status,
            component_health,
        })
    }
}

impl CommandMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let commands_total = IntCounterVec::new(
            Opts::new(
                "playtime_balance_commands_total",
                "Balance commands handled",
            ),
            &["rule"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let reports_total = IntCounterVec::new(
            Opts::new("playtime_balance_reports_total", "Balance reports produced"),
            &["outcome"],
        )?;
        registry.register(Box::new(reports_total.clone()))?;

        let deliveries_total = IntCounterVec::new(
            Opts::new(
                "playtime_balance_deliveries_total",
                "Balance report deliveries",
            ),
            &["channel", "status"],
        )?;
        registry.register(Box::new(deliveries_total.clone()))?;

        Ok(Self {
            commands_total,
            reports_total,
            deliveries_total,
        })
    }
}

impl PlaytimeMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let lookups_total = IntCounterVec::new(
            Opts::new(
                "playtime_balance_playtime_lookups_total",
                "Playtime source calls issued",
            ),
            &["shape"],
        )?;
        registry.register(Box::new(lookups_total.clone()))?;

        let source_failures_total = IntCounterVec::new(
            Opts::new(
                "playtime_balance_source_failures_total",
                "Sides that could not be aggregated",
            ),
            &["shape"],
        )?;
        registry.register(Box::new(source_failures_total.clone()))?;

        Ok(Self {
            lookups_total,
            source_failures_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let command_processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "playtime_balance_command_processing_duration_seconds",
                "Chat command processing time",
            )
            .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(command_processing_duration.clone()))?;

        let aggregation_duration = HistogramVec::new(
            HistogramOpts::new(
                "playtime_balance_aggregation_duration_seconds",
                "Side aggregation time",
            )
            .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["shape"],
        )?;
        registry.register(Box::new(aggregation_duration.clone()))?;

        let amqp_operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "playtime_balance_amqp_operation_duration_seconds",
                "AMQP operation duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation", "status"],
        )?;
        registry.register(Box::new(amqp_operation_duration.clone()))?;

        Ok(Self {
            command_processing_duration,
            aggregation_duration,
            amqp_operation_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Encoder;

    fn render(collector: &MetricsCollector) -> String {
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&collector.registry().gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _service = collector.service();
        let _commands = collector.commands();
        let _playtime = collector.playtime();
        let _performance = collector.performance();
    }

    #[test]
    fn test_command_recording() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_command("teams", ReportOutcome::Balance, Duration::from_millis(20));
        collector.record_command("teams", ReportOutcome::Unavailable, Duration::from_millis(5));
        collector.record_delivery(Delivery::Requester, true);

        assert_eq!(
            collector
                .commands()
                .commands_total
                .with_label_values(&["teams"])
                .get(),
            2
        );
        assert_eq!(
            collector
                .commands()
                .reports_total
                .with_label_values(&["unavailable"])
                .get(),
            1
        );

        let output = render(&collector);
        assert!(output.contains("playtime_balance_deliveries_total"));
        assert!(output.contains("channel=\"warn\""));
    }

    #[test]
    fn test_playtime_recording() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_lookups("per_player", 4);
        collector.record_source_failure("batch");
        collector.record_aggregation("batch", Duration::from_millis(3));

        assert_eq!(
            collector
                .playtime()
                .lookups_total
                .with_label_values(&["per_player"])
                .get(),
            4
        );
        assert_eq!(
            collector
                .playtime()
                .source_failures_total
                .with_label_values(&["batch"])
                .get(),
            1
        );
    }

    #[test]
    fn test_health_status_updates() {
        let collector = MetricsCollector::new().unwrap();

        collector.update_health_status(2);
        collector.update_component_health("amqp", false);
        assert_eq!(collector.service().health_status.get(), 2);
    }

    #[test]
    fn test_separate_registries() {
        // Two collectors must not collide on metric names
        let first = MetricsCollector::new();
        let second = MetricsCollector::new();
        assert!(first.is_ok());
        assert!(second.is_ok());
    }
}

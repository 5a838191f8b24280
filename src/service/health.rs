//! Service health reporting
//!
//! The running service shares a [`HealthProbe`] with the health endpoints;
//! [`HealthCheck`] turns it into liveness, readiness and detailed reports.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Live status flags of the running service
#[derive(Debug)]
pub struct HealthProbe {
    service_name: String,
    provider: String,
    rule_count: usize,
    running: AtomicBool,
    amqp_connected: AtomicBool,
    started_at: Instant,
}

impl HealthProbe {
    pub fn new(service_name: impl Into<String>, provider: impl Into<String>, rule_count: usize) -> Self {
        Self {
            service_name: service_name.into(),
            provider: provider.into(),
            rule_count,
            running: AtomicBool::new(false),
            amqp_connected: AtomicBool::new(false),
            started_at: Instant::now(),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_amqp_connected(&self, connected: bool) {
        self.amqp_connected.store(connected, Ordering::SeqCst);
    }

    pub fn is_amqp_connected(&self) -> bool {
        self.amqp_connected.load(Ordering::SeqCst)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Configured playtime provider
    pub provider: String,
    /// Number of balance rules loaded
    pub rules: usize,
    pub uptime_seconds: u64,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub fn check(probe: &HealthProbe) -> Self {
        let checks = vec![
            Self::check_service_running(probe),
            Self::check_amqp(probe),
            Self::check_command_table(probe),
        ];

        let status = checks
            .iter()
            .map(|check| check.status)
            .fold(HealthStatus::Healthy, worst);

        HealthCheck {
            status,
            service: probe.service_name.clone(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            provider: probe.provider.clone(),
            rules: probe.rule_count,
            uptime_seconds: probe.uptime_seconds(),
        }
    }

    /// Simple liveness check - just verify service is running
    pub fn liveness_check(probe: &HealthProbe) -> HealthStatus {
        if probe.is_running() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Readiness check - verify service can take commands
    pub fn readiness_check(probe: &HealthProbe) -> HealthStatus {
        if !probe.is_running() {
            return HealthStatus::Unhealthy;
        }
        Self::check_amqp(probe).status
    }

    fn check_service_running(probe: &HealthProbe) -> ComponentCheck {
        let (status, message) = if probe.is_running() {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
        }
    }

    fn check_amqp(probe: &HealthProbe) -> ComponentCheck {
        let (status, message) = if probe.is_amqp_connected() {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Not consuming chat commands".to_string()),
            )
        };

        ComponentCheck {
            name: "amqp_connection".to_string(),
            status,
            message,
        }
    }

    fn check_command_table(probe: &HealthProbe) -> ComponentCheck {
        let (status, message) = if probe.rule_count > 0 {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Degraded,
                Some("No balance rules loaded".to_string()),
            )
        };

        ComponentCheck {
            name: "command_table".to_string(),
            status,
            message,
        }
    }
}

fn worst(a: HealthStatus, b: HealthStatus) -> HealthStatus {
    match (a, b) {
        (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
        (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    }
}

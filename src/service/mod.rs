//! Service layer for the playtime balance service
//!
//! Wires configuration, playtime source, command table, AMQP transport and
//! monitoring into one running service.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthProbe, HealthStatus};

//! Configuration management for the playtime-balance service
//!
//! This module handles configuration loading from environment variables or a
//! TOML file, validation, and default values for the balance service.

pub mod app;
pub mod balance;
pub mod playtime;

// Re-export commonly used types
pub use app::{validate_config, AmqpSettings, AppConfig, ServiceSettings};
pub use balance::{default_balance_rules, BalanceRuleConfig};
pub use playtime::{PlaytimeProviderKind, PlaytimeSettings, SQUAD_GAME_ID};

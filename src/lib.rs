//! Playtime Balance - team experience balance for multiplayer matches
//!
//! This crate answers chat commands with the split of historical playtime
//! between the two teams of a match. It selects the players a rule counts,
//! looks up their playtime from an external provider, aggregates per side and
//! formats a percentage report for the game server to broadcast.

pub mod amqp;
pub mod balance;
pub mod command;
pub mod config;
pub mod error;
pub mod metrics;
pub mod playtime;
pub mod selection;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{BalanceError, Result};
pub use types::*;

// Re-export key components
pub use balance::{BalanceAggregator, BalanceReporter};
pub use command::{BalanceCommandHandler, CommandTable, MessageSink};
pub use selection::{CohortSelector, SelectionRule};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

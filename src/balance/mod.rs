//! Balance computation
//!
//! Aggregates the playtime of each side and formats the percentage split.

pub mod aggregator;
pub mod reporter;

pub use aggregator::BalanceAggregator;
pub use reporter::BalanceReporter;

//! Cohort selection for balance requests
//!
//! A [`SelectionRule`] decides which players of a roster are counted, and the
//! [`CohortSelector`] splits the matching players into the two sides by team.

pub mod rule;
pub mod selector;

// Re-export commonly used types
pub use rule::SelectionRule;
pub use selector::CohortSelector;

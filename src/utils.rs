//! Utility functions for the playtime balance service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique correlation ID for outbound messages
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Round half away from zero to the nearest integer
///
/// Only used on non-negative values, where this is plain half-up rounding.
pub fn round_half_up(value: f64) -> i64 {
    value.round() as i64
}

/// Share of `part` in `total` as a whole percentage, half-up
pub fn percentage(part: f64, total: f64) -> i64 {
    round_half_up(100.0 * part / total)
}

/// Normalise a chat trigger for case-insensitive lookup
pub fn normalize_trigger(trigger: &str) -> String {
    trigger.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_correlation_id();
        let id2 = generate_correlation_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(0.5), 1);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(33.333), 33);
        assert_eq!(round_half_up(66.667), 67);
        assert_eq!(round_half_up(0.0), 0);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(30.0, 100.0), 30);
        assert_eq!(percentage(1.0, 3.0), 33);
        assert_eq!(percentage(2.0, 3.0), 67);
        assert_eq!(percentage(0.0, 5.0), 0);
        assert_eq!(percentage(5.0, 5.0), 100);
    }

    #[test]
    fn test_normalize_trigger() {
        assert_eq!(normalize_trigger("Balance"), "balance");
        assert_eq!(normalize_trigger("  СЛБАЛАНС "), "слбаланс");
    }
}

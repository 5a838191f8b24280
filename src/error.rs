//! Error types for the playtime balance service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific balance scenarios
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("AMQP connection failed: {message}")]
    AmqpConnectionFailed { message: String },

    #[error("Invalid chat command: {reason}")]
    InvalidChatCommand { reason: String },

    #[error("Invalid selection rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Playtime source failed: {message}")]
    SourceFailed { message: String },

    #[error("Malformed playtime response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Message delivery failed: {message}")]
    DeliveryFailed { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

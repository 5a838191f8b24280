//! AMQP integration for the playtime balance service
//!
//! Chat commands arrive on a queue fed by the game server; broadcast and warn
//! requests go back through a topic exchange.

pub mod connection;
pub mod handlers;
pub mod messages;
pub mod publisher;

// Re-export commonly used types
pub use connection::{AmqpConfig, AmqpConnection};
pub use handlers::{ChatCommandConsumer, MessageHandler};
pub use messages::*;
pub use publisher::AmqpMessageSink;

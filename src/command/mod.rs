//! Chat command binding
//!
//! Maps trigger phrases to balance rules and runs the balance pipeline for
//! each incoming command.

pub mod handler;
pub mod sink;
pub mod table;

pub use handler::BalanceCommandHandler;
pub use sink::{deliver, MessageSink, RecordingSink, SentMessage};
pub use table::CommandTable;

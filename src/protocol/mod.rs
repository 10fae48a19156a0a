//! Protocol implementation
//!
//! Command parsing, the fixed wire control messages, and the per-command
//! handlers.

pub mod commands;
pub mod handlers;
pub mod messages;

pub use commands::{Command, CommandResult, CommandStatus, parse_command};
pub use handlers::handle_command;

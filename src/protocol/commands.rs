//! Module `commands`
//!
//! Defines the command parsing logic and related data structures used to
//! represent commands, their status, and results.

/// Represents a command parsed from one line of client input.
#[derive(Debug, PartialEq)]
pub enum Command {
    UPLOAD,
    DOWNLOAD,
    PREVIEW,
    DELETE,
    LIST,
    INVALID,
}

/// Represents the outcome status of executing a command.
pub enum CommandStatus {
    Success,
    Failure(String),
}

/// Struct encapsulating the full result of a command execution.
///
/// `message` is the final response line for this command, if one remains to
/// be sent after the handler's own dialogue.
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message.into()),
        }
    }

    /// Success with nothing left to send (the handler already wrote the
    /// full response itself).
    pub fn silent_success() -> Self {
        Self {
            status: CommandStatus::Success,
            message: None,
        }
    }

    pub fn failure(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message: Some(message.into()),
        }
    }

    /// Failure whose response already went out in-band (framed markers).
    pub fn silent_failure(reason: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message: None,
        }
    }
}

/// Parses a raw command line received from a client into the `Command` enum.
///
/// Case-insensitive and trimmed of surrounding whitespace; anything
/// unrecognized maps to `INVALID`.
pub fn parse_command(raw: &str) -> Command {
    match raw.trim().to_ascii_uppercase().as_str() {
        "UPLOAD" => Command::UPLOAD,
        "DOWNLOAD" => Command::DOWNLOAD,
        "PREVIEW" => Command::PREVIEW,
        "DELETE" => Command::DELETE,
        "LIST" => Command::LIST,
        _ => Command::INVALID,
    }
}

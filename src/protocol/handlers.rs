//! Command handlers for the vault server.
//!
//! Dispatches parsed commands to their handlers, each running the
//! per-command dialogue against the session's sandbox. Handler-level
//! failures (missing files, malformed metadata, disk errors) are logged and
//! converted to a failure response here; only transport-level errors
//! propagate as `io::Error` and close the session.

use log::{error, info, warn};
use std::io;

use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::error::TransferError;
use crate::protocol::messages;
use crate::protocol::{Command, CommandResult};
use crate::session::{Session, SessionState};
use crate::storage::Sandbox;
use crate::transfer::{engine, framing};

/// Dispatches a received command to its corresponding handler.
///
/// Returns the command's final response (if any remains to be sent after the
/// handler's own dialogue). `Err` means the transport failed and the session
/// must close.
pub async fn handle_command<R, W>(
    reader: &mut R,
    writer: &mut W,
    session: &mut Session,
    sandbox: &Sandbox,
    command: &Command,
) -> io::Result<CommandResult>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match command {
        Command::UPLOAD => handle_cmd_upload(reader, writer, session, sandbox).await,
        Command::DOWNLOAD => handle_cmd_download(reader, writer, session, sandbox).await,
        Command::PREVIEW => handle_cmd_preview(reader, writer, session, sandbox).await,
        Command::DELETE => handle_cmd_delete(reader, writer, session, sandbox).await,
        Command::LIST => handle_cmd_list(writer, session, sandbox).await,
        Command::INVALID => Ok(CommandResult::failure(
            "Unknown command",
            messages::INVALID_COMMAND,
        )),
    }
}

/// Reads the next metadata line of an in-flight command. EOF here is a
/// transport failure, not a handler failure.
async fn read_required_line<R>(reader: &mut R) -> io::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    framing::read_trimmed_line(reader).await?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "client disconnected mid-command",
        )
    })
}

/// Handles UPLOAD: prompts for `FILENAME:<name>`, then receives the chunked
/// stream into the sandbox, acknowledging each chunk.
async fn handle_cmd_upload<R, W>(
    reader: &mut R,
    writer: &mut W,
    session: &mut Session,
    sandbox: &Sandbox,
) -> io::Result<CommandResult>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    framing::write_line(writer, messages::UPLOAD_READY).await?;

    let file_info = read_required_line(reader).await?;
    let Some(raw_name) = file_info.strip_prefix(messages::FILENAME_PREFIX) else {
        warn!(
            "Malformed file information from {}: {:?}",
            session.peer_addr(),
            file_info
        );
        return Ok(CommandResult::failure(
            "Malformed file information",
            messages::UPLOAD_FAILED,
        ));
    };

    let path = match sandbox.resolve(raw_name) {
        Ok(path) => path,
        Err(e) => {
            warn!("Upload rejected for {}: {}", session.user_display(), e);
            return Ok(CommandResult::failure(e.to_string(), messages::UPLOAD_FAILED));
        }
    };

    framing::write_line(writer, messages::RECEIVING_CHUNKS).await?;

    session.set_state(SessionState::InTransfer);
    let outcome = engine::receive_file(reader, writer, &path).await;
    session.set_state(SessionState::AwaitingCommand);

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match outcome {
        Ok(bytes) => {
            info!(
                "File '{}' uploaded by {} ({} bytes)",
                filename,
                session.user_display(),
                bytes
            );
            Ok(CommandResult::success(messages::upload_successful(&filename)))
        }
        Err(TransferError::Disk(e)) => {
            error!(
                "Upload of '{}' by {} failed: {}",
                filename,
                session.user_display(),
                e
            );
            Ok(CommandResult::failure(e.to_string(), messages::UPLOAD_FAILED))
        }
        Err(TransferError::Socket(e)) => Err(e),
    }
}

/// Handles DOWNLOAD: prompts for a filename, then streams the file with no
/// per-chunk acknowledgment.
async fn handle_cmd_download<R, W>(
    reader: &mut R,
    writer: &mut W,
    session: &mut Session,
    sandbox: &Sandbox,
) -> io::Result<CommandResult>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    framing::write_line(writer, messages::DOWNLOAD_PROMPT).await?;

    let raw_name = read_required_line(reader).await?;
    let path = match sandbox.resolve(&raw_name) {
        Ok(path) => path,
        Err(e) => {
            warn!("Download rejected for {}: {}", session.user_display(), e);
            return Ok(CommandResult::failure(
                e.to_string(),
                messages::DOWNLOAD_FAILED,
            ));
        }
    };

    if !path.is_file() {
        info!(
            "Download of missing file '{}' requested by {}",
            raw_name,
            session.user_display()
        );
        return Ok(CommandResult::failure(
            "File not found",
            messages::DOWNLOAD_FAILED,
        ));
    }

    framing::write_line(writer, messages::FILE_EXISTS).await?;

    session.set_state(SessionState::InTransfer);
    let outcome = engine::send_file(writer, &path).await;
    session.set_state(SessionState::AwaitingCommand);

    match outcome {
        Ok(bytes) => {
            info!(
                "File '{}' sent to {} ({} bytes)",
                raw_name,
                session.user_display(),
                bytes
            );
            Ok(CommandResult::silent_success())
        }
        // The stream was already end-marked; anything more would desync the
        // peer's frame loop.
        Err(TransferError::Disk(e)) => {
            error!(
                "Download of '{}' by {} failed: {}",
                raw_name,
                session.user_display(),
                e
            );
            Ok(CommandResult::silent_failure(e.to_string()))
        }
        Err(TransferError::Socket(e)) => Err(e),
    }
}

/// Handles PREVIEW: prompts for a filename, then sends at most the first
/// 1024 bytes as a single frame, or the not-found marker.
async fn handle_cmd_preview<R, W>(
    reader: &mut R,
    writer: &mut W,
    session: &mut Session,
    sandbox: &Sandbox,
) -> io::Result<CommandResult>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    framing::write_line(writer, messages::PREVIEW_PROMPT).await?;

    let raw_name = read_required_line(reader).await?;
    let path = match sandbox.resolve(&raw_name) {
        Ok(path) => path,
        Err(e) => {
            warn!("Preview rejected for {}: {}", session.user_display(), e);
            framing::write_not_found(writer).await?;
            return Ok(CommandResult::silent_failure(e.to_string()));
        }
    };

    if !path.is_file() {
        info!(
            "Preview of missing file '{}' requested by {}",
            raw_name,
            session.user_display()
        );
        framing::write_not_found(writer).await?;
        return Ok(CommandResult::silent_failure("File not found"));
    }

    session.set_state(SessionState::InTransfer);
    let outcome = engine::send_preview(writer, &path).await;
    session.set_state(SessionState::AwaitingCommand);

    match outcome {
        Ok(bytes) => {
            info!(
                "Previewed '{}' for {} ({} bytes)",
                raw_name,
                session.user_display(),
                bytes
            );
            Ok(CommandResult::silent_success())
        }
        Err(TransferError::Disk(e)) => {
            error!(
                "Preview of '{}' by {} failed: {}",
                raw_name,
                session.user_display(),
                e
            );
            Ok(CommandResult::silent_failure(e.to_string()))
        }
        Err(TransferError::Socket(e)) => Err(e),
    }
}

/// Handles DELETE: prompts for a filename and removes it. Irreversible; no
/// confirmation step.
async fn handle_cmd_delete<R, W>(
    reader: &mut R,
    writer: &mut W,
    session: &Session,
    sandbox: &Sandbox,
) -> io::Result<CommandResult>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    framing::write_line(writer, messages::DELETE_PROMPT).await?;

    let raw_name = read_required_line(reader).await?;
    match sandbox.delete(&raw_name) {
        Ok(filename) => {
            info!("File '{}' deleted by {}", filename, session.user_display());
            Ok(CommandResult::success(messages::delete_successful(&filename)))
        }
        Err(e) => {
            warn!(
                "Delete of '{}' by {} failed: {}",
                raw_name,
                session.user_display(),
                e
            );
            Ok(CommandResult::failure(e.to_string(), messages::DELETE_FAILED))
        }
    }
}

/// Handles LIST: returns the sandbox's non-recursive entries as one framed
/// message (the listing body embeds newlines, so it cannot be a control
/// line).
async fn handle_cmd_list<W>(
    writer: &mut W,
    session: &Session,
    sandbox: &Sandbox,
) -> io::Result<CommandResult>
where
    W: AsyncWrite + Unpin,
{
    let result = match sandbox.list() {
        Ok(names) => {
            info!(
                "Listed {} entries for {}",
                names.len(),
                session.user_display()
            );
            (messages::file_listing(&names), CommandResult::silent_success())
        }
        Err(e) => {
            error!("Failed to list sandbox of {}: {}", session.user_display(), e);
            (
                messages::LIST_FAILED.to_string(),
                CommandResult::silent_failure(e.to_string()),
            )
        }
    };

    framing::write_chunk(writer, result.0.as_bytes()).await?;
    framing::write_end_marker(writer).await?;
    Ok(result.1)
}

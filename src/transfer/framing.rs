//! Wire framing
//!
//! Two record kinds travel on the wire:
//!
//! - Control messages: UTF-8 lines terminated by `\n`, newline-free payload.
//! - Data frames: `[tag: u8][len: u32 big-endian][payload]`. The tag byte
//!   keeps the end-marker (and the preview not-found marker) distinguishable
//!   from any payload bytes.
//!
//! Binary payload is never sent bare; one frame is one logical message.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

/// Chunk size for upload and download payload frames.
pub const CHUNK_SIZE: usize = 4096;

/// Maximum bytes sent for a PREVIEW, as a single frame.
pub const PREVIEW_SIZE: usize = 1024;

/// Upper bound on an accepted frame length. Anything larger is a protocol
/// violation, not a legitimate chunk.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Upper bound on an accepted control line, terminator included. Applies to
/// every line read, including the pre-authentication credential line.
pub const MAX_LINE_LENGTH: usize = 512;

const TAG_DATA: u8 = 0;
const TAG_END: u8 = 1;
const TAG_NOT_FOUND: u8 = 2;

/// Write half of a session's connection, shared between the session task
/// (responses, transfer frames) and the shutdown broadcaster (notice line).
pub type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

/// One decoded frame.
#[derive(Debug, PartialEq)]
pub enum Frame {
    Chunk(Vec<u8>),
    End,
    NotFound,
}

/// Writes one newline-terminated control line.
pub async fn write_line<W>(writer: &mut W, message: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(message.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Locks the shared writer and writes one control line.
pub async fn send_line(writer: &SharedWriter, message: &str) -> io::Result<()> {
    let mut guard = writer.lock().await;
    write_line(&mut *guard, message).await
}

/// Reads one control line, trimmed of the terminator and surrounding
/// whitespace. Returns `None` on orderly EOF.
///
/// The read is bounded: a line that has not ended within `MAX_LINE_LENGTH`
/// bytes is a protocol violation, and the excess is never buffered.
pub async fn read_trimmed_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader
        .take(MAX_LINE_LENGTH as u64 + 1)
        .read_line(&mut line)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if n > MAX_LINE_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "control line exceeds length limit",
        ));
    }
    Ok(Some(line.trim().to_string()))
}

/// Writes one data chunk frame.
pub async fn write_chunk<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(TAG_DATA).await?;
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Writes the end-of-stream marker.
pub async fn write_end_marker<W>(writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(TAG_END).await?;
    writer.write_u32(0).await?;
    writer.flush().await
}

/// Writes the preview not-found marker.
pub async fn write_not_found<W>(writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(TAG_NOT_FOUND).await?;
    writer.write_u32(0).await?;
    writer.flush().await
}

/// Reads and decodes one frame.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let tag = reader.read_u8().await?;
    let len = reader.read_u32().await? as usize;

    match tag {
        TAG_DATA => {
            if len > MAX_FRAME_SIZE {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame of {} bytes exceeds limit", len),
                ));
            }
            let mut payload = vec![0u8; len];
            reader.read_exact(&mut payload).await?;
            Ok(Frame::Chunk(payload))
        }
        TAG_END if len == 0 => Ok(Frame::End),
        TAG_NOT_FOUND if len == 0 => Ok(Frame::NotFound),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid frame header: tag {} len {}", tag, len),
        )),
    }
}

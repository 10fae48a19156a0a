//! Chunked file transfer engine
//!
//! Moves one logical byte stream per call: client-to-disk for uploads,
//! disk-to-client for downloads and previews. Socket failures and disk
//! failures are kept apart so the command handlers can decide what survives
//! the session (see `TransferError`).
//!
//! Invariant: once a framed response has started, the frame stream is always
//! terminated (end-marker or not-found marker) even when the disk side
//! fails, so the peer's frame loop can never hang on a handler-level error.

use std::io;
use std::path::Path;

use log::warn;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransferError;
use crate::protocol::messages;
use crate::transfer::framing::{self, CHUNK_SIZE, Frame, PREVIEW_SIZE};

/// Receives a chunked upload into `path`, acknowledging every chunk.
///
/// The file is created (or truncated) before the first chunk is read. The
/// stream ends at the end-marker. On a disk failure the remaining chunks are
/// drained and acked so the peer reaches its end-marker; the failure
/// response line then follows from the handler. Returns the bytes written.
pub async fn receive_file<R, W>(
    reader: &mut R,
    writer: &mut W,
    path: &Path,
) -> Result<u64, TransferError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut file = match File::create(path).await {
        Ok(file) => file,
        Err(e) => {
            drain_upload(reader, writer)
                .await
                .map_err(TransferError::Socket)?;
            return Err(TransferError::Disk(e));
        }
    };

    let mut received: u64 = 0;
    loop {
        match framing::read_frame(reader).await.map_err(TransferError::Socket)? {
            Frame::Chunk(chunk) => {
                if let Err(e) = file.write_all(&chunk).await {
                    warn!("Write failed mid-upload to {}: {}", path.display(), e);
                    framing::write_line(writer, messages::CHUNK_RECEIVED)
                        .await
                        .map_err(TransferError::Socket)?;
                    drain_upload(reader, writer)
                        .await
                        .map_err(TransferError::Socket)?;
                    return Err(TransferError::Disk(e));
                }
                received += chunk.len() as u64;
                framing::write_line(writer, messages::CHUNK_RECEIVED)
                    .await
                    .map_err(TransferError::Socket)?;
            }
            Frame::End => break,
            Frame::NotFound => return Err(TransferError::Socket(unexpected_frame())),
        }
    }

    file.flush().await.map_err(TransferError::Disk)?;
    Ok(received)
}

/// Consumes an upload stream up to its end-marker, acking each chunk without
/// storing anything.
async fn drain_upload<R, W>(reader: &mut R, writer: &mut W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        match framing::read_frame(reader).await? {
            Frame::Chunk(_) => framing::write_line(writer, messages::CHUNK_RECEIVED).await?,
            Frame::End => return Ok(()),
            Frame::NotFound => return Err(unexpected_frame()),
        }
    }
}

fn unexpected_frame() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "unexpected frame during upload")
}

/// Streams `path` to the client in fixed-size chunk frames, then the
/// end-marker. No per-chunk acknowledgment is required.
pub async fn send_file<W>(writer: &mut W, path: &Path) -> Result<u64, TransferError>
where
    W: AsyncWrite + Unpin,
{
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            framing::write_end_marker(writer)
                .await
                .map_err(TransferError::Socket)?;
            return Err(TransferError::Disk(e));
        }
    };

    let mut buffer = [0u8; CHUNK_SIZE];
    let mut sent: u64 = 0;
    loop {
        let n = match file.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Read failed mid-download of {}: {}", path.display(), e);
                framing::write_end_marker(writer)
                    .await
                    .map_err(TransferError::Socket)?;
                return Err(TransferError::Disk(e));
            }
        };
        framing::write_chunk(writer, &buffer[..n])
            .await
            .map_err(TransferError::Socket)?;
        sent += n as u64;
    }

    framing::write_end_marker(writer)
        .await
        .map_err(TransferError::Socket)?;
    Ok(sent)
}

/// Sends at most the first `PREVIEW_SIZE` bytes of `path` as a single frame
/// followed by the end-marker, or the not-found marker if the file cannot be
/// read. One-shot; no acknowledgment protocol.
pub async fn send_preview<W>(writer: &mut W, path: &Path) -> Result<usize, TransferError>
where
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; PREVIEW_SIZE];
    let mut filled = 0;

    let disk_result: io::Result<()> = async {
        let mut file = File::open(path).await?;
        // A single read may return short; fill up to the limit or EOF.
        loop {
            let n = file.read(&mut buffer[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
            if filled == buffer.len() {
                break;
            }
        }
        Ok(())
    }
    .await;

    if let Err(e) = disk_result {
        framing::write_not_found(writer)
            .await
            .map_err(TransferError::Socket)?;
        return Err(TransferError::Disk(e));
    }

    framing::write_chunk(writer, &buffer[..filled])
        .await
        .map_err(TransferError::Socket)?;
    framing::write_end_marker(writer)
        .await
        .map_err(TransferError::Socket)?;
    Ok(filled)
}

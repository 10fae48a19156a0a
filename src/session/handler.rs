//! Session lifecycle
//!
//! Runs one connection start to finish: the single authentication
//! round-trip, then the command loop until remote close, transport error,
//! or a pending shutdown broadcast.

use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{Mutex, broadcast};

use crate::auth::{self, CredentialStore};
use crate::config::ServerConfig;
use crate::protocol::{CommandStatus, handle_command, messages, parse_command};
use crate::server::registry::{SessionEntry, SharedRegistry};
use crate::session::{Session, SessionState};
use crate::storage::Sandbox;
use crate::transfer::SharedWriter;
use crate::transfer::framing;

/// Runs a full session on an accepted connection.
///
/// Always leaves the registry clean: an authenticated session removes
/// itself on every exit path.
pub async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: SharedRegistry,
    credentials: Arc<CredentialStore>,
    config: Arc<ServerConfig>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let writer: SharedWriter = Arc::new(Mutex::new(write_half));
    let mut session = Session::new(peer_addr);

    let authenticated = authenticate(
        &mut reader,
        &writer,
        &mut session,
        &registry,
        &credentials,
        &config,
        &mut shutdown_rx,
    )
    .await;

    match authenticated {
        Ok(Some(sandbox)) => {
            command_loop(&mut reader, &writer, &mut session, &sandbox, &mut shutdown_rx).await;
        }
        Ok(None) => {
            // One failed attempt closes the connection; no retry.
        }
        Err(e) => {
            warn!("Connection error during authentication of {}: {}", peer_addr, e);
        }
    }

    if session.is_authenticated() {
        registry.lock().await.remove(&peer_addr);
        info!(
            "Session for {} ({}) closed",
            session.user_display(),
            peer_addr
        );
    }
}

/// Performs the single authentication round-trip.
///
/// On success the session is registered (before the success line goes out)
/// and its sandbox directory is opened. `Ok(None)` means the attempt failed
/// and the failure line was sent. The credential read races the shutdown
/// signal, so a connection idle at the prompt cannot outlive the server.
async fn authenticate(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &SharedWriter,
    session: &mut Session,
    registry: &SharedRegistry,
    credentials: &CredentialStore,
    config: &ServerConfig,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> io::Result<Option<Sandbox>> {
    framing::send_line(writer, messages::AUTH_CHALLENGE).await?;

    let line = tokio::select! {
        _ = shutdown_rx.recv() => {
            info!(
                "Shutdown pending; closing unauthenticated connection from {}",
                session.peer_addr()
            );
            return Ok(None);
        }
        read = framing::read_trimmed_line(reader) => match read? {
            Some(line) => line,
            None => {
                info!("{} disconnected before authenticating", session.peer_addr());
                return Ok(None);
            }
        }
    };

    let username = match auth::verify_credentials(credentials, &line) {
        Ok(username) => username,
        Err(e) => {
            warn!("Authentication failed for {}: {}", session.peer_addr(), e);
            framing::send_line(writer, messages::AUTH_FAILED).await?;
            return Ok(None);
        }
    };

    let sandbox = match Sandbox::open(&config.storage_root_path(), &username) {
        Ok(sandbox) => sandbox,
        Err(e) => {
            error!("Failed to open sandbox for {}: {}", username, e);
            framing::send_line(writer, messages::AUTH_FAILED).await?;
            return Ok(None);
        }
    };

    session.set_authenticated(username.clone());
    registry.lock().await.insert(
        session.peer_addr(),
        SessionEntry::new(username.clone(), Arc::clone(writer)),
    );
    framing::send_line(writer, messages::AUTH_SUCCESS).await?;

    info!("Authenticated {} from {}", username, session.peer_addr());
    Ok(Some(sandbox))
}

/// The command loop: one line in, one command dispatched, one response out,
/// strictly sequential.
async fn command_loop(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &SharedWriter,
    session: &mut Session,
    sandbox: &Sandbox,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!(
                    "Shutdown pending; closing session for {}",
                    session.user_display()
                );
                session.set_state(SessionState::Closed);
                break;
            }
            read = framing::read_trimmed_line(reader) => match read {
                Ok(None) => {
                    info!("Connection closed by client {}", session.peer_addr());
                    session.set_state(SessionState::Closed);
                    break;
                }
                Ok(Some(line)) => {
                    let command = parse_command(&line);
                    info!("Received from {}: {:?}", session.peer_addr(), command);

                    // The write half stays locked for the whole command so
                    // transfer frames can never interleave with broadcast
                    // lines.
                    let outcome = {
                        let mut w = writer.lock().await;
                        match handle_command(reader, &mut *w, session, sandbox, &command).await {
                            Ok(result) => {
                                let mut sent = Ok(());
                                if let Some(message) = &result.message {
                                    sent = framing::write_line(&mut *w, message).await;
                                }
                                sent.map(|_| result)
                            }
                            Err(e) => Err(e),
                        }
                    };

                    match outcome {
                        Ok(result) => {
                            if let CommandStatus::Failure(reason) = &result.status {
                                warn!(
                                    "Command {:?} from {} failed: {}",
                                    command,
                                    session.user_display(),
                                    reason
                                );
                            }
                        }
                        Err(e) => {
                            error!(
                                "Transport failure for {} ({}): {}",
                                session.user_display(),
                                session.peer_addr(),
                                e
                            );
                            session.set_state(SessionState::Closed);
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to read from {}: {}", session.peer_addr(), e);
                    session.set_state(SessionState::Closed);
                    break;
                }
            }
        }
    }
}

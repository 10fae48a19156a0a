//! Server core
//!
//! The connection dispatcher: one task multiplexes accept-readiness and the
//! shutdown signal; each accepted connection runs its whole session inside
//! a separate task, bounded by a worker-pool semaphore.

use log::{error, info};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Semaphore, broadcast};

use crate::auth::CredentialStore;
use crate::config::ServerConfig;
use crate::server::registry::{SessionRegistry, SharedRegistry};
use crate::session::run_session;

pub struct Server {
    listener: TcpListener,
    registry: SharedRegistry,
    credentials: Arc<CredentialStore>,
    config: Arc<ServerConfig>,
    workers: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
    session_stop: broadcast::Sender<()>,
}

/// Handle for requesting a server shutdown from outside the accept loop
/// (tests, embedders). The same path the interrupt signal takes.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // Nothing to do if the server already stopped listening.
        let _ = self.tx.send(());
    }
}

impl Server {
    /// Binds the listener and prepares the shared session state.
    pub async fn bind(config: ServerConfig, credentials: CredentialStore) -> io::Result<Self> {
        let listener = TcpListener::bind(config.socket_addr()).await?;
        info!("Server bound to {}", listener.local_addr()?);

        let (shutdown_tx, _) = broadcast::channel(1);
        let (session_stop, _) = broadcast::channel(1);

        Ok(Self {
            registry: Arc::new(Mutex::new(SessionRegistry::default())),
            credentials: Arc::new(credentials),
            workers: Arc::new(Semaphore::new(config.max_sessions)),
            config: Arc::new(config),
            listener,
            shutdown_tx,
            session_stop,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Accept loop. Returns after a shutdown request (interrupt or
    /// `ShutdownHandle`) once every registered session has been notified;
    /// the listener closes when the server is dropped, after the broadcast.
    pub async fn run(self) -> io::Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!(
            "Vault server listening on {} (max {} sessions)",
            self.listener.local_addr()?,
            self.config.max_sessions
        );

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        error!("Failed to listen for interrupt: {}", e);
                    }
                    info!("Interrupt received; shutting down");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested; shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        info!("New connection from {}", peer_addr);
                        self.dispatch(stream, peer_addr);
                    }
                    Err(e) => error!("Error accepting connection: {}", e),
                }
            }
        }

        self.broadcast_shutdown().await;
        Ok(())
    }

    /// Hands an accepted connection to the worker pool. The session task
    /// waits for a free permit, so excess connections queue instead of
    /// being refused.
    fn dispatch(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let registry = Arc::clone(&self.registry);
        let credentials = Arc::clone(&self.credentials);
        let config = Arc::clone(&self.config);
        let workers = Arc::clone(&self.workers);
        let stop_rx = self.session_stop.subscribe();

        tokio::spawn(async move {
            let _permit = match workers.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // pool closed; server is gone
            };
            run_session(stream, peer_addr, registry, credentials, config, stop_rx).await;
        });
    }

    /// Notifies every registered session, then signals their loops to
    /// close. Runs before the listener is dropped.
    async fn broadcast_shutdown(&self) {
        let registry = self.registry.lock().await;
        if registry.is_empty() {
            info!("No live sessions to notify of shutdown");
        } else {
            info!("Broadcasting shutdown to {} live sessions", registry.len());
            registry.broadcast_shutdown().await;
        }
        drop(registry);

        let _ = self.session_stop.send(());
    }
}

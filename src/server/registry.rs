//! Session registry
//!
//! The set of currently authenticated sessions, keyed by peer address.
//! Mutated by session tasks on creation/teardown and read by the shutdown
//! broadcaster; every access goes through one shared async mutex.

use log::{info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::protocol::messages;
use crate::transfer::SharedWriter;
use crate::transfer::framing;

/// Registry entry for one live session: who it is and where its notices go.
pub struct SessionEntry {
    username: String,
    writer: SharedWriter,
}

impl SessionEntry {
    pub fn new(username: String, writer: SharedWriter) -> Self {
        Self { username, writer }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Map of live authenticated sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<SocketAddr, SessionEntry>,
}

pub type SharedRegistry = Arc<Mutex<SessionRegistry>>;

impl SessionRegistry {
    pub fn insert(&mut self, peer_addr: SocketAddr, entry: SessionEntry) {
        self.sessions.insert(peer_addr, entry);
    }

    pub fn remove(&mut self, peer_addr: &SocketAddr) -> Option<SessionEntry> {
        self.sessions.remove(peer_addr)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Best-effort shutdown notice to every registered session.
    ///
    /// A writer busy inside a transfer is skipped rather than corrupting its
    /// frame stream; failures are logged, never retried.
    pub async fn broadcast_shutdown(&self) {
        for (peer_addr, entry) in &self.sessions {
            match entry.writer.try_lock() {
                Ok(mut writer) => {
                    if let Err(e) =
                        framing::write_line(&mut *writer, messages::SERVER_SHUTDOWN).await
                    {
                        warn!(
                            "Failed to notify {} ({}) of shutdown: {}",
                            entry.username(),
                            peer_addr,
                            e
                        );
                    } else {
                        info!("Notified {} ({}) of shutdown", entry.username(), peer_addr);
                    }
                }
                Err(_) => {
                    warn!(
                        "Session {} ({}) is mid-transfer; shutdown notice skipped",
                        entry.username(),
                        peer_addr
                    );
                }
            }
        }
    }
}

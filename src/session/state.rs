//! Module `state`
//!
//! Defines the `Session` struct tracking per-connection state: peer
//! identity, authentication status, and the command-loop state machine.

use std::net::SocketAddr;

/// Command-loop states.
///
/// `AwaitingCommand` is entered after successful authentication;
/// `InTransfer` while a handler drives the transfer engine, always
/// returning to `AwaitingCommand` when the transfer completes or fails at
/// the handler level. `Closed` is terminal: remote EOF, a transport error,
/// or a pending shutdown broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingCommand,
    InTransfer,
    Closed,
}

/// Server-side state for one connection, alive for its duration.
///
/// Owned exclusively by the task running the session loop; the registry
/// keeps only the username and a shared write-half handle.
pub struct Session {
    peer_addr: SocketAddr,
    username: Option<String>,
    authenticated: bool,
    state: SessionState,
}

impl Session {
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            username: None,
            authenticated: false,
            state: SessionState::AwaitingCommand,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Marks the session authenticated. Set once, by the authentication
    /// round-trip.
    pub fn set_authenticated(&mut self, username: String) {
        self.username = Some(username);
        self.authenticated = true;
    }

    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// Username for log lines, before or after authentication.
    pub fn user_display(&self) -> &str {
        self.username.as_deref().unwrap_or("<unauthenticated>")
    }
}

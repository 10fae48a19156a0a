//! Session management
//!
//! Per-connection state and the session lifecycle (authentication
//! round-trip plus command loop).

pub mod handler;
pub mod state;

pub use handler::run_session;
pub use state::{Session, SessionState};

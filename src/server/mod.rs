//! Server core
//!
//! Connection dispatch, the bounded worker pool, and the live-session
//! registry.

pub mod core;
pub mod registry;

pub use core::{Server, ShutdownHandle};
pub use registry::{SessionEntry, SessionRegistry, SharedRegistry};

//! Error handling
//!
//! Defines error types for the vault server.

pub mod types;

pub use types::*;

//! Storage system
//!
//! Per-user sandbox directories under the configured storage root.

pub mod sandbox;

pub use sandbox::Sandbox;

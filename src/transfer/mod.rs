//! File transfer system
//!
//! Wire framing and the chunked transfer engine shared by the upload,
//! download and preview handlers.

pub mod engine;
pub mod framing;

pub use framing::{Frame, SharedWriter};

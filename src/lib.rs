//! RAX Vault Server
//!
//! An authenticated file-transfer service: clients authenticate against a
//! static credential list and work with a per-user sandboxed file store
//! through the commands UPLOAD, DOWNLOAD, PREVIEW, DELETE and LIST.

pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod storage;
pub mod transfer;

pub use server::{Server, ShutdownHandle};

//! Error types
//!
//! Defines domain-specific error types for each module of the vault server.

use std::fmt;
use std::io;

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    MalformedCredentials,
    UserNotFound(String),
    InvalidPassword(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MalformedCredentials => {
                write!(f, "Malformed credentials: expected 'username:password'")
            }
            AuthError::UserNotFound(u) => write!(f, "User not found: {}", u),
            AuthError::InvalidPassword(u) => write!(f, "Invalid password for user: {}", u),
        }
    }
}

impl std::error::Error for AuthError {}

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    InvalidFilename(String),
    FileNotFound(String),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidFilename(n) => write!(f, "Invalid filename: {}", n),
            StorageError::FileNotFound(n) => write!(f, "File not found: {}", n),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// Transfer module errors
///
/// `Disk` failures are handler-level: they are logged, become a failure
/// response line, and the session continues. `Socket` failures are
/// transport-level and tear the session down.
#[derive(Debug)]
pub enum TransferError {
    Disk(io::Error),
    Socket(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Disk(e) => write!(f, "File IO failed during transfer: {}", e),
            TransferError::Socket(e) => write!(f, "Connection failed during transfer: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

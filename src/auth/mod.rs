//! Authentication system
//!
//! Credential storage and the one-shot credential check performed on every
//! new connection.

pub mod credentials;
pub mod validator;

pub use credentials::CredentialStore;
pub use validator::verify_credentials;

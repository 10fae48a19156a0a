//! Configuration management
//!
//! Loads server settings from an optional `config.toml` with `RAX_VAULT_*`
//! environment overrides, falling back to coded defaults.

use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener.
    pub bind_address: String,

    /// Listener port. `0` picks an ephemeral port (used by tests).
    pub port: u16,

    /// Worker pool size: the maximum number of concurrent sessions. Excess
    /// connections queue for a free worker.
    pub max_sessions: usize,

    /// Root directory holding one sandbox subdirectory per user.
    pub storage_root: String,

    /// File of `username:secret` lines.
    pub credentials_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 12345,
            max_sessions: 10,
            storage_root: "./vault_root".to_string(),
            credentials_file: "./credentials.txt".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `config.toml` (if present) with environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("port", defaults.port as i64)?
            .set_default("max_sessions", defaults.max_sessions as i64)?
            .set_default("storage_root", defaults.storage_root)?
            .set_default("credentials_file", defaults.credentials_file)?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("RAX_VAULT"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sessions == 0 {
            return Err(ConfigError::Message(
                "max_sessions must be greater than 0".into(),
            ));
        }
        if self.storage_root.is_empty() {
            return Err(ConfigError::Message("storage_root cannot be empty".into()));
        }
        if self.credentials_file.is_empty() {
            return Err(ConfigError::Message(
                "credentials_file cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Listener address as `host:port`.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Storage root as a path.
    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr(), "127.0.0.1:12345");
    }

    #[test]
    fn test_validate_rejects_zero_sessions() {
        let config = ServerConfig {
            max_sessions: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_storage_root() {
        let config = ServerConfig {
            storage_root: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! RAX Vault Server - Entry Point

use log::{error, info, warn};
use std::path::Path;

use rax_vault_server::Server;
use rax_vault_server::auth::CredentialStore;
use rax_vault_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    // env_logger picks up the RUST_LOG environment variable
    env_logger::init();

    info!("Launching vault server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let credentials = match CredentialStore::load(Path::new(&config.credentials_file)) {
        Ok(store) => {
            info!(
                "Loaded {} credentials from {}",
                store.len(),
                config.credentials_file
            );
            store
        }
        Err(e) => {
            warn!(
                "Credential file {} not readable ({}); no login will succeed",
                config.credentials_file, e
            );
            CredentialStore::default()
        }
    };

    if let Err(e) = std::fs::create_dir_all(config.storage_root_path()) {
        error!("Failed to create storage root {}: {}", config.storage_root, e);
        std::process::exit(1);
    }

    let server = match Server::bind(config, credentials).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Server terminated with error: {}", e);
        std::process::exit(1);
    }
}

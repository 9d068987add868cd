//! CLI command implementations.

pub mod call;
pub mod demo;
pub mod directory;
pub mod init;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use switchboard::directory::{connect_to_store, Directory};

use crate::config::Config;

/// Connect to the networked store named in the config.
pub(crate) async fn connect_directory(config: &Config) -> Result<Directory> {
    let addr: SocketAddr = config
        .directory
        .store_addr
        .parse()
        .with_context(|| format!("Invalid store address: {}", config.directory.store_addr))?;
    let store = connect_to_store(addr)
        .await
        .with_context(|| format!("Failed to connect to directory store at {}", addr))?;
    Ok(Directory::new(Arc::new(store), config.directory.clone()))
}

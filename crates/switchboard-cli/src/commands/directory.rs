//! Directory store commands.
//!
//! Run the shared store other processes announce into, and inspect what is
//! currently announced there.

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::sync::Arc;
use switchboard::directory::{MemoryStore, StoreServer};

use super::connect_directory;
use crate::config::Config;

/// Serve an in-memory directory store until interrupted.
pub fn serve(config: &Config, listen: Option<String>) -> Result<()> {
    let listen = listen.unwrap_or_else(|| config.directory.store_addr.clone());
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", listen))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let server = StoreServer::new(Arc::new(MemoryStore::new()));
        let (local_addr, serving) = server
            .bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        println!(
            "{} Directory store listening on {}",
            "ready".green().bold(),
            local_addr
        );

        tokio::select! {
            _ = serving => {}
            _ = tokio::signal::ctrl_c() => {
                println!("{} Shutting down", "stop".yellow().bold());
            }
        }
        Ok(())
    })
}

/// Resolve a service to one provider address.
pub fn resolve(config: &Config, service: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let directory = connect_directory(config).await?;
        let address = directory
            .resolve(service)
            .await
            .with_context(|| format!("Failed to resolve {}", service))?;
        println!("{}", address);
        Ok(())
    })
}

/// List every live provider of a service.
pub fn providers(config: &Config, service: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let directory = connect_directory(config).await?;
        let providers = directory.providers(service).await?;

        println!("{}", format!("Providers of {}", service).green().bold());
        println!("  Path: {}", directory.service_path(service));
        for address in &providers {
            println!("    {}", address.cyan());
        }
        if providers.is_empty() {
            println!("    (no live providers)");
        }
        Ok(())
    })
}

/// List every live announcing process.
pub fn nodes(config: &Config) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let directory = connect_directory(config).await?;
        let nodes = directory.nodes().await?;

        println!("{}", "Live nodes".green().bold());
        for (identity, address) in &nodes {
            println!("    {} -- {}", identity.cyan(), address);
        }
        if nodes.is_empty() {
            println!("    (no live nodes)");
        }
        Ok(())
    })
}

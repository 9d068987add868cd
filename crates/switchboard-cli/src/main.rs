//! Switchboard CLI - run a directory, serve the demo service, call methods.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(author, version, about = "Switchboard - discoverable RPC services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: switchboard.toml in this or a parent directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default switchboard.toml
    Init {
        /// Target directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Run a directory store
    Directory {
        /// Address to listen on (default: directory.store_addr)
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Resolve a service to one live provider
    Resolve {
        /// Service name
        service: String,
    },

    /// List every live provider of a service
    Providers {
        /// Service name
        service: String,
    },

    /// List live announcing processes
    Nodes,

    /// Serve the demo Math service
    ServeDemo {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:0")]
        listen: String,
    },

    /// Call a method
    Call {
        /// Qualified method name (Service.Method)
        method: String,

        /// Arguments as JSON
        #[arg(default_value = "null")]
        args: String,

        /// Call this address instead of resolving the service
        #[arg(short, long)]
        addr: Option<String>,

        /// Send without waiting for the reply
        #[arg(long, conflicts_with = "addr")]
        oneway: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Explicit config file if given, otherwise the nearest switchboard.toml.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Directory { listen } => {
            commands::directory::serve(&load_config(config_path)?, listen)
        }
        Commands::Resolve { service } => {
            commands::directory::resolve(&load_config(config_path)?, &service)
        }
        Commands::Providers { service } => {
            commands::directory::providers(&load_config(config_path)?, &service)
        }
        Commands::Nodes => commands::directory::nodes(&load_config(config_path)?),
        Commands::ServeDemo { listen } => {
            commands::demo::serve(&load_config(config_path)?, &listen)
        }
        Commands::Call {
            method,
            args,
            addr,
            oneway,
        } => {
            let config = load_config(config_path)?;
            if oneway {
                commands::call::notify(&config, &method, &args)
            } else {
                commands::call::run(&config, &method, &args, addr)
            }
        }
    }
}

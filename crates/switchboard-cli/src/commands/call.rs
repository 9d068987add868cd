//! Call a method with JSON arguments.

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use switchboard::rpc::{CallError, Client};

use super::connect_directory;
use crate::config::Config;

fn parse_args(args: &str) -> Result<Value> {
    serde_json::from_str(args).with_context(|| format!("Arguments are not JSON: {}", args))
}

/// Call `method` with `args` (JSON) and print the reply.
///
/// With `addr`, the directory is not consulted.
pub fn run(config: &Config, method: &str, args: &str, addr: Option<String>) -> Result<()> {
    let args = parse_args(args)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let directory = connect_directory(config).await?;
        let client = Client::new(directory, config.client.clone());

        let outcome: Result<Value, CallError> = match &addr {
            Some(addr) => client.call_addr(addr, method, &args).await,
            None => client.call(method, &args).await,
        };

        match outcome {
            Ok(reply) => {
                println!("{}", serde_json::to_string_pretty(&reply)?);
                Ok(())
            }
            Err(CallError::Application(message)) => {
                println!("{} {}", "error".red().bold(), message);
                anyhow::bail!("{} returned an error", method)
            }
            Err(e) => Err(e).with_context(|| format!("Call to {} failed", method)),
        }
    })
}

/// Send `method` with `args` (JSON) without waiting for a reply.
pub fn notify(config: &Config, method: &str, args: &str) -> Result<()> {
    let args = parse_args(args)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let directory = connect_directory(config).await?;
        let client = Client::new(directory, config.client.clone());
        client
            .notify(method, &args)
            .await
            .with_context(|| format!("Call to {} failed", method))?;
        // the request goes out on a background task
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        println!("{} {}", "sent".green().bold(), method);
        Ok(())
    })
}

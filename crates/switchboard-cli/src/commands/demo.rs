//! Demo arithmetic service.

use anyhow::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use switchboard::core::{Methods, Receiver};
use switchboard::rpc::Server;

use super::connect_directory;
use crate::config::Config;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Num {
    pub value: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub a: i64,
    pub b: i64,
}

/// Integer arithmetic exposed as the `Math` service.
pub struct Math;

impl Math {
    fn square(&self, args: Num, reply: &mut Num) -> Result<(), String> {
        reply.value = args
            .value
            .checked_mul(args.value)
            .ok_or_else(|| format!("{} squared overflows", args.value))?;
        Ok(())
    }

    fn add(&self, args: Pair, reply: &mut Num) -> Result<(), String> {
        reply.value = args
            .a
            .checked_add(args.b)
            .ok_or_else(|| format!("{} + {} overflows", args.a, args.b))?;
        Ok(())
    }

    fn divide(&self, args: Pair, reply: &mut Num) -> Result<(), String> {
        if args.b == 0 {
            return Err("divide by zero".to_string());
        }
        reply.value = args.a / args.b;
        Ok(())
    }
}

impl Receiver for Math {
    fn methods(methods: &mut Methods<Self>) {
        methods
            .add("Square", Math::square)
            .add("Add", Math::add)
            .add("Divide", Math::divide);
    }
}

/// Serve `Math` and announce it until interrupted.
pub fn serve(config: &Config, listen: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let directory = connect_directory(config).await?;
        let server = Server::new(directory, config.server.clone());
        let methods = server.register(Arc::new(Math))?;

        let listener = server.bind(listen).await?;
        println!(
            "{} Math ({} methods) listening on {}",
            "ready".green().bold(),
            methods,
            listener.local_addr()
        );

        tokio::select! {
            _ = listener.run() => {}
            _ = tokio::signal::ctrl_c() => {
                server.close().await?;
                println!("{} Stopped announcing Math", "stop".yellow().bold());
            }
        }
        Ok(())
    })
}

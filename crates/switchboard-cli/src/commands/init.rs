//! Write a default switchboard.toml.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};

pub fn run(path: Option<String>) -> Result<()> {
    let base_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };

    let config_path = base_path.join(CONFIG_FILE);
    if config_path.exists() {
        println!("  {} {} already exists", "•".yellow(), config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&base_path)?;
    Config::default().save(&config_path)?;
    println!("  {} Created {}", "✓".green(), config_path.display());

    println!();
    println!("Next steps:");
    println!("  {} switchboard directory", "1.".blue());
    println!("  {} switchboard serve-demo", "2.".blue());
    println!("  {} switchboard call Math.Square '{{\"value\": 3}}'", "3.".blue());

    Ok(())
}

//! Config command - show the effective settings.

use anyhow::{Context, Result};

use super::run::RunArgs;
use crate::config::AppConfig;

/// Prints the settings a run would use, as TOML, followed by the config
/// files they were layered from.
pub fn run(args: &RunArgs, config: &AppConfig) -> Result<()> {
    let settings = toml::to_string(&args.settings()).context("Failed to render settings")?;
    print!("{settings}");

    println!();
    if config.sources.is_empty() {
        println!("# No config files loaded");
    } else {
        for path in &config.sources {
            println!("# Loaded {}", path.display());
        }
    }
    Ok(())
}

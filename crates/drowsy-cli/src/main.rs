//! Drowsy CLI - Real-time driver drowsiness detection.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{Cli, Commands, ExitCode};
use config::AppConfig;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load();

    let exit_code = match cli.command {
        Some(Commands::Run(args)) => run(commands::run::RunArgs::with_config(args, &config)),
        Some(Commands::Config(args)) => {
            let args = commands::run::RunArgs::with_config(args, &config);
            report(commands::config::run(&args, &config))
        }
        Some(Commands::Models(args)) => {
            let run_args = commands::run::RunArgs::with_config(cli.run, &config);
            report(commands::models::run(&args, &run_args))
        }
        // Default behavior: monitor with the flattened run args
        None => run(commands::run::RunArgs::with_config(cli.run, &config)),
    };

    exit_code.into()
}

fn run(args: commands::run::RunArgs) -> ExitCode {
    match commands::run::run(&args) {
        Ok(result) => {
            tracing::debug!("Run summary: {:?}", result.summary);
            result.exit_code
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Error
        }
    }
}

fn report(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Error
        }
    }
}

//! CLI command definitions and handlers.

pub mod config;
pub mod models;
pub mod run;

use clap::{Parser, Subcommand};

/// Drowsy - driver drowsiness detection from eye aspect ratio
#[derive(Parser)]
#[command(name = "drowsy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Monitoring arguments, usable without the `run` subcommand.
    #[command(flatten)]
    pub run: run::RunArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Monitor a camera, video or frame directory for drowsiness
    Run(run::RunArgs),
    /// Print the effective settings after config files and flags
    Config(run::RunArgs),
    /// Manage ML models
    Models(models::ModelsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Finished without any drowsiness alarm.
    Success = 0,
    /// At least one drowsiness alarm fired.
    DrowsinessDetected = 1,
    /// Something went wrong.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

//! Models command - manage ML models.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Args, Subcommand};
use drowsy_adapters::models::{
    ensure_models_with_progress, list_models as adapter_list_models, model_info,
};
use indicatif::{ProgressBar, ProgressStyle};

use super::run::RunArgs;

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// Download required models
    Fetch {
        /// Download again even if already installed
        #[arg(long)]
        force: bool,

        /// Mirror holding every model file, instead of the upstream URLs
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },
    /// List installed models
    List,
    /// Print model directory path
    Path,
}

/// Run the models command.
pub fn run(args: &ModelsArgs, run_args: &RunArgs) -> Result<()> {
    let dir = args
        .models_dir
        .clone()
        .unwrap_or_else(|| run_args.resolved_models_dir());

    match &args.command {
        ModelsCommand::Fetch { force, url } => {
            let mirror = url.as_deref().or_else(|| run_args.models_url());
            fetch_models(&dir, mirror, *force)
        }
        ModelsCommand::List => {
            list_models(&dir);
            Ok(())
        }
        ModelsCommand::Path => {
            println!("{}", dir.display());
            Ok(())
        }
    }
}

fn fetch_models(dir: &std::path::Path, mirror: Option<&str>, force: bool) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
            .map_err(|e| anyhow::anyhow!("Invalid progress template: {e}"))?
            .progress_chars("#>-"),
    );

    let current_model = Mutex::new(String::new());
    let progress = |name: &str, downloaded: u64, total: Option<u64>| {
        let is_new_model = {
            let mut current = current_model
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if *current == name {
                false
            } else {
                *current = name.to_string();
                true
            }
        };
        if is_new_model {
            pb.set_length(total.unwrap_or(0));
            pb.set_message(name.to_string());
        }
        pb.set_position(downloaded);
    };

    let fetched = ensure_models_with_progress(dir, mirror, force, Some(&progress))?;

    if fetched.is_empty() {
        pb.finish_and_clear();
        println!("All models already installed in {}", dir.display());
    } else {
        pb.finish_with_message(format!("Downloaded {}", fetched.join(", ")));
    }
    Ok(())
}

fn list_models(dir: &std::path::Path) {
    let models = adapter_list_models(dir);

    println!("Models directory: {}", dir.display());
    println!();

    for model in &models {
        let status = if model.installed() { "✓" } else { "✗" };
        let description = model_info(model.name).map_or("", |m| m.description);
        let filename = model
            .path
            .file_name()
            .map_or_else(String::new, |f| f.to_string_lossy().into_owned());
        let name = model.name;
        match model.size {
            Some(size) => println!("  {status} {name} ({filename}, {size} bytes) {description}"),
            None => println!("  {status} {name} ({filename}) {description}"),
        }
    }

    println!();
    let installed_count = models.iter().filter(|m| m.installed()).count();
    println!("{}/{} models installed", installed_count, models.len());
}

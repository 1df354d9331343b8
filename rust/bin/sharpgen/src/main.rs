//! `sharpgen`: C# bindings for O3DE gems.
//!
//! Usage:
//!   sharpgen generate [--project DIR] [--config FILE] [--no-incremental] [-v]
//!   sharpgen modules
//!   sharpgen deps <MODULE>

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sharpgen_core::{GeneratorConfig, DEFAULT_CONFIG_FILE};
use tracing_subscriber::EnvFilter;

/// C# binding generator.
#[derive(Parser, Debug)]
#[command(name = "sharpgen", about = "Generate C# bindings for O3DE gems")]
struct Cli {
    /// Project root (default: current directory).
    #[arg(long = "project", short = 'p', global = true, default_value = ".")]
    project: PathBuf,

    /// Configuration file, relative to the project root.
    #[arg(long = "config", short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Debug logging.
    #[arg(long = "verbose", short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate bindings for every enabled module.
    Generate {
        /// Regenerate everything, ignoring the cache.
        #[arg(long = "no-incremental")]
        no_incremental: bool,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List enabled modules in build order.
    Modules,

    /// Show what a module depends on and what depends on it.
    Deps {
        /// Module name.
        module: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose || config_requests_verbose(&cli));

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Generate { no_incremental, json } => {
            commands::generate::run(&cli.project, config, no_incremental, json)?;
        }
        Commands::Modules => {
            commands::modules::list(&cli.project, config)?;
        }
        Commands::Deps { module } => {
            commands::modules::deps(&cli.project, config, &module)?;
        }
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` when verbose.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The `global.verbose` flag, read before logging is installed.
fn config_requests_verbose(cli: &Cli) -> bool {
    let path = match &cli.config {
        Some(path) => cli.project.join(path),
        None => cli.project.join(DEFAULT_CONFIG_FILE),
    };
    GeneratorConfig::read(&path).is_ok_and(|config| config.global.verbose)
}

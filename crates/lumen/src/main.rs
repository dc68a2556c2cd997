//! Lumen CLI - concurrent batch image processing.
//!
//! Lumen applies named image operations (resize, rotate, blur, canny, ...) to
//! every input image in parallel and writes one file per (image, operation).
//!
//! # Usage
//!
//! ```bash
//! # Blur and edge-detect a single image
//! lumen process photo.jpg -d out -o blur -o canny
//!
//! # Process a directory with custom parameters and a JSON report
//! lumen process ./photos/ -d out -o resize --param resize.scale_x=0.5 \
//!     --param resize.scale_y=0.5 --report report.json
//!
//! # List operations and their defaults
//! lumen operations
//!
//! # View configuration
//! lumen config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Lumen - concurrent batch image processing.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "LUMEN_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply operations to a batch of images
    Process(cli::process::ProcessArgs),

    /// List available operations with their parameters and defaults
    Operations(cli::operations::OperationsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // An explicit config file must load; the default one falls back to defaults.
    // Logging isn't initialized yet, so use eprintln for the warning.
    let config = match &cli.config {
        Some(path) => lumen_core::Config::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => match lumen_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `lumen config path`."
                );
                lumen_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Lumen v{}", lumen_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Process(args) => cli::process::execute(args, config).await,
        Commands::Operations(args) => cli::operations::execute(args, &config),
        Commands::Config(args) => cli::config::execute(args, &config, cli.config.as_deref()),
    }
}

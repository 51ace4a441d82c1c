//! bundlesync CLI - resolve and download versioned asset bundles.

mod commands;
mod error;
mod manifest_file;

use std::path::PathBuf;

use bundlesync::logging::{self, LoggingConfig};
use clap::{Parser, Subcommand};
use console::style;

use commands::download::DownloadArgs;
use commands::resolve::ResolveArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "bundlesync", version, about = "Resolve and download versioned asset bundles")]
struct Cli {
    /// Write rolling log files into this directory
    #[arg(long, global = true, env = "BUNDLESYNC_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, env = "BUNDLESYNC_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the bundles that would be downloaded
    Resolve(ResolveArgs),
    /// Download the selected bundles into a cache directory
    Download(DownloadArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::default().with_default_directive(cli.log.clone());
    if let Some(dir) = &cli.log_dir {
        logging_config = logging_config.with_log_dir(dir);
    }
    let _guard = logging::init(&logging_config)?;

    match cli.command {
        Commands::Resolve(args) => commands::resolve::run(args),
        Commands::Download(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(CliError::Runtime)?;
            runtime.block_on(commands::download::run(args))
        }
    }
}

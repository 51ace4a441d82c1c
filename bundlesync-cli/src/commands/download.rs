//! `bundlesync download`: fetch the selected bundles into a cache directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bundlesync::operation::{
    OperationBridge, PoolRegistry, ProgressSink, SchedulerConfig, TickScheduler,
};
use bundlesync::transfer::{
    DownloaderConfig, HttpBundleFetcher, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES,
    DEFAULT_TIMEOUT_SECS,
};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::common::{create_downloader, format_size, SourceArgs};
use crate::error::CliError;

/// Arguments for `download`.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory bundles are written to
    #[arg(long, env = "BUNDLESYNC_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Maximum simultaneous transfers
    #[arg(long, env = "BUNDLESYNC_MAX_CONCURRENCY", default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Retries per bundle, alternating primary and fallback host
    #[arg(long, env = "BUNDLESYNC_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Per-attempt timeout in seconds
    #[arg(long, env = "BUNDLESYNC_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Skip SHA-256 verification of downloaded bundles
    #[arg(long, env = "BUNDLESYNC_NO_VERIFY")]
    pub no_verify: bool,
}

impl DownloadArgs {
    fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig::new()
            .with_max_concurrency(self.max_concurrency)
            .with_max_retries(self.max_retries)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// Default cache directory (`~/.cache/bundlesync` on Linux).
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("bundlesync")
}

/// Run the download command.
pub async fn run(args: DownloadArgs) -> Result<(), CliError> {
    let mode = args.source.play_mode()?;
    let operation = create_downloader(&mode, &args.source.selection(), args.downloader_config())?;

    if operation.total_count() == 0 {
        println!("{}", style("Nothing to download").green());
        return Ok(());
    }

    let cache_dir = args.resolved_cache_dir();
    let fetcher = HttpBundleFetcher::new(&cache_dir)?.with_verify_checksums(!args.no_verify);

    println!(
        "Downloading {} bundles ({}) into {}",
        operation.total_count(),
        format_size(operation.total_bytes()),
        cache_dir.display()
    );

    let total_bytes = operation.total_bytes();
    let bar = ProgressBar::new(total_bytes);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> "),
    );

    let error_bar = bar.clone();
    operation.on_error(move |bundle, error| {
        error_bar.println(format!("{} {}: {}", style("✗").red(), bundle.file_name, error));
    });
    operation.on_start_file(|bundle| {
        debug!(file = %bundle.file_name, size = bundle.file_size, "Starting bundle");
    });

    let scheduler = Arc::new(TickScheduler::new());
    let registry = PoolRegistry::new();
    let bridge = OperationBridge::new(&registry, Arc::clone(&scheduler));
    let shutdown = CancellationToken::new();
    let ticker = scheduler.spawn(SchedulerConfig::default(), shutdown.clone());

    let sink_bar = bar.clone();
    let sink: ProgressSink = Arc::new(move |progress| {
        sink_bar.set_position((progress as f64 * total_bytes as f64) as u64);
    });

    operation.begin(Arc::new(fetcher));
    let task = bridge.to_task(Arc::new(operation.clone()), Some(sink));

    let interrupted = operation.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling download");
            interrupted.cancel();
        }
    });

    let result = task.await;

    watcher.abort();
    shutdown.cancel();
    let _ = ticker.await;
    debug!(pools = ?registry.sizes(), "Slot pools after download");

    match result {
        Ok(()) => {
            bar.finish_and_clear();
            println!(
                "{} Downloaded {} bundles ({})",
                style("✓").green(),
                operation.current_count(),
                format_size(operation.current_bytes())
            );
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DownloadArgs {
        DownloadArgs {
            source: SourceArgs {
                manifest: PathBuf::from("manifest.json"),
                remote_base: "http://cdn".to_string(),
                fallback_base: None,
                buildin: None,
                tags: Vec::new(),
                assets: Vec::new(),
            },
            cache_dir: None,
            max_concurrency: 0,
            max_retries: 2,
            timeout_secs: 5,
            no_verify: false,
        }
    }

    #[test]
    fn test_downloader_config_from_args() {
        let config = args().downloader_config();
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_cache_dir_override() {
        let mut args = args();
        assert!(args.resolved_cache_dir().ends_with("bundlesync"));
        args.cache_dir = Some(PathBuf::from("/data/bundles"));
        assert_eq!(args.resolved_cache_dir(), PathBuf::from("/data/bundles"));
    }
}

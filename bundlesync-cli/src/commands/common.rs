//! Arguments and helpers shared by the resolve and download commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bundlesync::manifest::AssetInfo;
use bundlesync::playmode::WebPlayMode;
use bundlesync::resolver::BundleInfo;
use bundlesync::services::{BuildinCatalog, HostRemoteServices};
use bundlesync::transfer::{DownloaderConfig, TransferOperation};
use clap::Args;
use tracing::debug;

use crate::error::CliError;
use crate::manifest_file::load_manifest;

/// Where the manifest and bundles come from, and what to select.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Manifest JSON file
    #[arg(long, env = "BUNDLESYNC_MANIFEST")]
    pub manifest: PathBuf,

    /// Primary remote host serving bundle files
    #[arg(long, env = "BUNDLESYNC_REMOTE_BASE")]
    pub remote_base: String,

    /// Fallback remote host (defaults to the primary host)
    #[arg(long, env = "BUNDLESYNC_FALLBACK_BASE")]
    pub fallback_base: Option<String>,

    /// Text file listing bundle files shipped with the application, one per line
    #[arg(long, env = "BUNDLESYNC_BUILDIN")]
    pub buildin: Option<PathBuf>,

    /// Select untagged bundles plus bundles carrying any of these tags
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub tags: Vec<String>,

    /// Select the bundles needed by these asset paths
    #[arg(long = "asset", num_args = 1..)]
    pub assets: Vec<String>,
}

/// Which bundles a command works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Tags(Vec<String>),
    Assets(Vec<AssetInfo>),
}

impl SourceArgs {
    /// Asset paths take precedence over tags; neither selects everything.
    pub fn selection(&self) -> Selection {
        if !self.assets.is_empty() {
            Selection::Assets(self.assets.iter().map(AssetInfo::new).collect())
        } else if !self.tags.is_empty() {
            Selection::Tags(self.tags.clone())
        } else {
            Selection::All
        }
    }

    /// Build a play mode with the manifest activated.
    pub fn play_mode(&self) -> Result<WebPlayMode, CliError> {
        let manifest = load_manifest(&self.manifest)?;

        let catalog = match &self.buildin {
            Some(path) => load_buildin_catalog(manifest.package_name(), path)?,
            None => BuildinCatalog::new(),
        };
        let fallback = self
            .fallback_base
            .clone()
            .unwrap_or_else(|| self.remote_base.clone());
        let remote = HostRemoteServices::new(self.remote_base.clone(), fallback);

        debug!(
            package = manifest.package_name(),
            buildin = catalog.len(),
            "Play mode configured"
        );

        let mode = WebPlayMode::new(manifest.package_name(), Arc::new(catalog), Arc::new(remote));
        mode.set_active_manifest(manifest);
        Ok(mode)
    }
}

/// Resolve the download list for a selection.
pub fn resolve_list(mode: &WebPlayMode, selection: &Selection) -> Result<Vec<BundleInfo>, CliError> {
    let operation = create_downloader(mode, selection, DownloaderConfig::default())?;
    Ok(operation.bundles())
}

/// Create a downloader for a selection.
pub fn create_downloader(
    mode: &WebPlayMode,
    selection: &Selection,
    config: DownloaderConfig,
) -> Result<TransferOperation, CliError> {
    let operation = match selection {
        Selection::All => mode.create_downloader_by_all(config)?,
        Selection::Tags(tags) => mode.create_downloader_by_tags(tags, config)?,
        Selection::Assets(assets) => mode.create_downloader_by_paths(assets, config)?,
    };
    Ok(operation)
}

/// Parse a build-in catalog: one file name per line, `#` starts a comment.
pub fn parse_buildin_catalog(package_name: &str, text: &str) -> BuildinCatalog {
    let files = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty());
    BuildinCatalog::from_files(package_name, files)
}

/// Read a build-in catalog file.
pub fn load_buildin_catalog(package_name: &str, path: &Path) -> Result<BuildinCatalog, CliError> {
    let text = fs::read_to_string(path).map_err(|e| CliError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parse_buildin_catalog(package_name, &text))
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

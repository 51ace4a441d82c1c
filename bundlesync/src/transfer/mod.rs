//! Bundle transfer orchestration.
//!
//! - [`TransferOperation`]: batch transfer with bounded concurrency,
//!   per-attempt deadlines and primary/fallback retries
//! - [`BundleFetcher`]: raw fetch collaborator
//! - [`HttpBundleFetcher`]: reqwest-based fetcher writing into a cache
//!   directory with size and SHA-256 verification

mod checksum;
mod config;
mod error;
mod fetcher;
mod http;
mod operation;
mod state;

pub use checksum::{calculate_file_checksum, verify_checksum};
pub use config::{
    DownloaderConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_TIMEOUT_SECS,
};
pub use error::{TransferError, TransferResult};
pub use fetcher::{BundleFetcher, FetchRequest};
pub use http::HttpBundleFetcher;
pub use operation::{
    ErrorCallback, FinishCallback, ProgressCallback, StartFileCallback, TransferKind,
    TransferOperation,
};
pub use state::{TransferCounters, TransferProgress};

//! Configuration for bundle transfers.

use std::time::Duration;

/// Default number of simultaneous transfers.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Default number of retries per bundle.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-attempt deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default pause between attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Configuration for a [`TransferOperation`](super::TransferOperation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Maximum simultaneous transfers. Never below 1.
    pub max_concurrency: usize,

    /// Retries per bundle after the first attempt.
    pub max_retries: u32,

    /// Deadline for a single attempt.
    pub timeout: Duration,

    /// Pause before each retry.
    pub retry_delay: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl DownloaderConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit. Zero is raised to 1.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Set the retry count.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the pause between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Total attempts per bundle.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

//! Transfer orchestrator.
//!
//! A [`TransferOperation`] owns a resolved download list and moves it
//! through a [`BundleFetcher`]:
//!
//! ```text
//! begin(fetcher)
//!     │
//!     ▼
//! stream of bundles ──buffer_unordered(max_concurrency)──► transfer_bundle
//!                                                            │
//!                         attempt 0: main_url ◄──────────────┤
//!                         attempt 1: fallback_url            │ timeout per attempt
//!                         attempt 2: main_url ...            │
//!                                                            ▼
//!                            first exhausted bundle ──► operation Failed
//!                            all bundles done      ──► operation Succeeded
//! ```
//!
//! The operation implements [`OperationHandle`], so it can be awaited
//! through the operation bridge like any loading handle.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::DownloaderConfig;
use super::error::{TransferError, TransferResult};
use super::fetcher::{BundleFetcher, FetchRequest};
use super::state::{TransferCounters, TransferProgress};
use crate::manifest::PackageBundle;
use crate::operation::{
    CompletionCallback, CompletionEvent, OperationHandle, OperationStatus, SubscriptionId,
};
use crate::resolver::BundleInfo;

/// What a transfer operation does with its bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Fetch remote bundles into the cache.
    Download,
    /// Copy build-in bundles into the cache.
    Unpack,
    /// Import bundles from local file paths.
    Import,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Download => "download",
            Self::Unpack => "unpack",
            Self::Import => "import",
        };
        f.write_str(s)
    }
}

/// Called when a bundle transfer starts.
pub type StartFileCallback = Arc<dyn Fn(&PackageBundle) + Send + Sync>;

/// Called whenever progress changes.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Called when a bundle exhausts its attempts.
pub type ErrorCallback = Arc<dyn Fn(&PackageBundle, &TransferError) + Send + Sync>;

/// Called once with the final outcome (true on success).
pub type FinishCallback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default, Clone)]
struct Callbacks {
    on_start_file: Option<StartFileCallback>,
    on_progress: Option<ProgressCallback>,
    on_error: Option<ErrorCallback>,
    on_finish: Option<FinishCallback>,
}

#[derive(Debug)]
struct RunState {
    status: OperationStatus,
    error: Option<String>,
}

struct Shared {
    kind: TransferKind,
    config: DownloaderConfig,
    bundles: Mutex<Vec<BundleInfo>>,
    counters: TransferCounters,
    state: Mutex<RunState>,
    callbacks: Mutex<Callbacks>,
    event: CompletionEvent,
    cancel: CancellationToken,
}

/// Batch transfer of resolved bundles.
///
/// Cloning yields another reference to the same operation.
#[derive(Clone)]
pub struct TransferOperation {
    shared: Arc<Shared>,
}

impl TransferOperation {
    /// Create an operation over `bundles`. Nothing runs until
    /// [`begin`](Self::begin).
    pub fn new(kind: TransferKind, bundles: Vec<BundleInfo>, config: DownloaderConfig) -> Self {
        let operation = Self {
            shared: Arc::new(Shared {
                kind,
                config,
                bundles: Mutex::new(Vec::new()),
                counters: TransferCounters::new(),
                state: Mutex::new(RunState {
                    status: OperationStatus::None,
                    error: None,
                }),
                callbacks: Mutex::new(Callbacks::default()),
                event: CompletionEvent::new(),
                cancel: CancellationToken::new(),
            }),
        };
        operation.replace_bundles(bundles);
        operation
    }

    /// An operation with nothing to do. It is already succeeded.
    pub fn empty(kind: TransferKind, config: DownloaderConfig) -> Self {
        let operation = Self::new(kind, Vec::new(), config);
        operation.shared.finish(Ok(()));
        operation
    }

    /// Operation kind.
    pub fn kind(&self) -> TransferKind {
        self.shared.kind
    }

    /// Configuration in use.
    pub fn config(&self) -> &DownloaderConfig {
        &self.shared.config
    }

    /// Bundles in this operation.
    pub fn bundles(&self) -> Vec<BundleInfo> {
        self.shared.bundles.lock().clone()
    }

    /// Number of bundles to transfer.
    pub fn total_count(&self) -> usize {
        self.snapshot().total_count
    }

    /// Total bytes to transfer.
    pub fn total_bytes(&self) -> u64 {
        self.snapshot().total_bytes
    }

    /// Bundles finished so far.
    pub fn current_count(&self) -> usize {
        self.snapshot().current_count
    }

    /// Bytes received so far.
    pub fn current_bytes(&self) -> u64 {
        self.snapshot().current_bytes
    }

    /// Progress snapshot.
    pub fn snapshot(&self) -> TransferProgress {
        self.shared.counters.snapshot()
    }

    /// Register the start-file callback.
    pub fn on_start_file(&self, callback: impl Fn(&PackageBundle) + Send + Sync + 'static) {
        self.shared.callbacks.lock().on_start_file = Some(Arc::new(callback));
    }

    /// Register the progress callback.
    pub fn on_progress(&self, callback: impl Fn(TransferProgress) + Send + Sync + 'static) {
        self.shared.callbacks.lock().on_progress = Some(Arc::new(callback));
    }

    /// Register the per-bundle error callback.
    pub fn on_error(
        &self,
        callback: impl Fn(&PackageBundle, &TransferError) + Send + Sync + 'static,
    ) {
        self.shared.callbacks.lock().on_error = Some(Arc::new(callback));
    }

    /// Register the finish callback.
    pub fn on_finish(&self, callback: impl Fn(bool) + Send + Sync + 'static) {
        self.shared.callbacks.lock().on_finish = Some(Arc::new(callback));
    }

    /// Merge another operation's bundles into this one.
    ///
    /// Bundles are deduplicated by file name. Only allowed before either
    /// operation began; returns false otherwise.
    pub fn combine(&self, other: &TransferOperation) -> bool {
        if Arc::ptr_eq(&self.shared, &other.shared) {
            return true;
        }
        if self.status() != OperationStatus::None || other.status() != OperationStatus::None {
            warn!(kind = %self.shared.kind, "Cannot combine operations that already began");
            return false;
        }

        let mut merged = self.bundles();
        let mut seen: HashSet<String> = merged
            .iter()
            .map(|info| info.bundle.file_name.clone())
            .collect();
        for info in other.bundles() {
            if seen.insert(info.bundle.file_name.clone()) {
                merged.push(info);
            }
        }
        self.replace_bundles(merged);
        true
    }

    /// Start transferring on the current tokio runtime.
    ///
    /// Ignored unless the operation is idle. An empty operation succeeds
    /// immediately.
    pub fn begin(&self, fetcher: Arc<dyn BundleFetcher>) {
        {
            let mut state = self.shared.state.lock();
            if state.status != OperationStatus::None {
                debug!(kind = %self.shared.kind, status = %state.status, "Operation already started");
                return;
            }
            state.status = OperationStatus::Processing;
        }

        let bundles = self.bundles();
        if bundles.is_empty() {
            self.shared.finish(Ok(()));
            return;
        }

        info!(
            kind = %self.shared.kind,
            bundles = bundles.len(),
            bytes = self.total_bytes(),
            max_concurrency = self.shared.config.max_concurrency,
            "Transfer starting"
        );

        let shared = Arc::clone(&self.shared);
        tokio::spawn(run(shared, fetcher, bundles));
    }

    /// Stop the operation. It fails with "user cancelled".
    pub fn cancel(&self) {
        self.shared.finish(Err(TransferError::Cancelled));
    }

    /// Returns true once the operation finished.
    pub fn is_done(&self) -> bool {
        self.status().is_done()
    }

    fn replace_bundles(&self, bundles: Vec<BundleInfo>) {
        let bytes = bundles.iter().map(|info| info.bundle.file_size).sum();
        self.shared.counters.set_totals(bundles.len(), bytes);
        *self.shared.bundles.lock() = bundles;
    }
}

impl OperationHandle for TransferOperation {
    fn subscribe(&self, callback: CompletionCallback) -> SubscriptionId {
        self.shared.event.subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.event.unsubscribe(id)
    }

    fn status(&self) -> OperationStatus {
        self.shared.state.lock().status
    }

    fn last_error(&self) -> Option<String> {
        self.shared.state.lock().error.clone()
    }

    fn progress(&self) -> f32 {
        self.snapshot().ratio()
    }

    fn is_valid(&self) -> bool {
        true
    }
}

impl fmt::Debug for TransferOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOperation")
            .field("kind", &self.shared.kind)
            .field("status", &self.status())
            .field("progress", &self.snapshot())
            .finish()
    }
}

// =============================================================================
// Execution
// =============================================================================

impl Shared {
    fn callbacks(&self) -> Callbacks {
        self.callbacks.lock().clone()
    }

    fn notify_progress(&self) {
        if let Some(callback) = self.callbacks().on_progress {
            callback(self.counters.snapshot());
        }
    }

    /// Latch the terminal outcome. Only the first call counts.
    fn finish(&self, outcome: TransferResult<()>) {
        let succeeded = outcome.is_ok();
        {
            let mut state = self.state.lock();
            if state.status.is_done() {
                return;
            }
            match outcome {
                Ok(()) => state.status = OperationStatus::Succeeded,
                Err(e) => {
                    state.status = OperationStatus::Failed;
                    state.error = Some(e.to_string());
                }
            }
        }
        self.cancel.cancel();

        if succeeded {
            info!(kind = %self.kind, "Transfer finished");
        } else {
            warn!(kind = %self.kind, error = ?self.state.lock().error, "Transfer failed");
        }

        if let Some(callback) = self.callbacks().on_finish {
            callback(succeeded);
        }
        self.event.fire();
    }
}

async fn run(shared: Arc<Shared>, fetcher: Arc<dyn BundleFetcher>, bundles: Vec<BundleInfo>) {
    let cancel = shared.cancel.clone();
    let limit = shared.config.max_concurrency.max(1);

    let mut transfers = stream::iter(bundles.into_iter().map(|info| {
        let shared = Arc::clone(&shared);
        let fetcher = Arc::clone(&fetcher);
        async move { transfer_bundle(&shared, fetcher.as_ref(), &info).await }
    }))
    .buffer_unordered(limit);

    let outcome = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                break Err(TransferError::Cancelled);
            }

            next = transfers.next() => match next {
                Some(Ok(())) => {}
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            }
        }
    };

    // Dropping the stream aborts transfers still in flight.
    drop(transfers);
    shared.finish(outcome);
}

async fn transfer_bundle(
    shared: &Shared,
    fetcher: &dyn BundleFetcher,
    info: &BundleInfo,
) -> TransferResult<()> {
    let bundle = info.bundle.as_ref();
    if let Some(callback) = shared.callbacks().on_start_file {
        callback(bundle);
    }

    let mut attempt: u32 = 0;
    loop {
        let url = info.url_for_attempt(attempt);
        let received = AtomicU64::new(0);
        let on_bytes = |bytes: u64| {
            received.fetch_add(bytes, Ordering::SeqCst);
            shared.counters.add_bytes(bytes);
            shared.notify_progress();
        };

        let request = FetchRequest {
            bundle,
            url,
            attempt,
        };
        let result = tokio::time::timeout(shared.config.timeout, fetcher.fetch(request, &on_bytes))
            .await
            .unwrap_or_else(|_| {
                Err(TransferError::Timeout {
                    url: url.to_string(),
                    timeout: shared.config.timeout,
                })
            });

        let error = match result {
            Ok(_) => {
                shared
                    .counters
                    .complete_file(received.load(Ordering::SeqCst), bundle.file_size);
                shared.notify_progress();
                debug!(file = %bundle.file_name, attempt, "Bundle transferred");
                return Ok(());
            }
            Err(e) => e,
        };

        shared.counters.remove_bytes(received.load(Ordering::SeqCst));

        if !error.is_retryable() || attempt >= shared.config.max_retries {
            warn!(file = %bundle.file_name, attempts = attempt + 1, error = %error, "Bundle transfer failed");
            if let Some(callback) = shared.callbacks().on_error {
                callback(bundle, &error);
            }
            return Err(error);
        }

        warn!(file = %bundle.file_name, attempt, url, error = %error, "Bundle transfer attempt failed, retrying");
        attempt += 1;
        if !shared.config.retry_delay.is_zero() {
            tokio::time::sleep(shared.config.retry_delay).await;
        }
    }
}

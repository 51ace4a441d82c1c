//! Transfer progress counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Snapshot of a transfer's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProgress {
    /// Bundles in the operation.
    pub total_count: usize,
    /// Bundles finished so far.
    pub current_count: usize,
    /// Bytes in the operation.
    pub total_bytes: u64,
    /// Bytes received so far.
    pub current_bytes: u64,
}

impl TransferProgress {
    /// Progress as a ratio in `[0.0, 1.0]`.
    ///
    /// Byte-based, falling back to bundle counts when sizes are unknown.
    pub fn ratio(&self) -> f32 {
        let ratio = if self.total_bytes > 0 {
            self.current_bytes as f64 / self.total_bytes as f64
        } else if self.total_count > 0 {
            self.current_count as f64 / self.total_count as f64
        } else {
            1.0
        };
        ratio.clamp(0.0, 1.0) as f32
    }
}

/// Atomic counters shared by concurrent transfers.
#[derive(Debug, Default)]
pub struct TransferCounters {
    total_count: AtomicUsize,
    total_bytes: AtomicU64,
    current_count: AtomicUsize,
    current_bytes: AtomicU64,
}

impl TransferCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation totals.
    pub fn set_totals(&self, count: usize, bytes: u64) {
        self.total_count.store(count, Ordering::SeqCst);
        self.total_bytes.store(bytes, Ordering::SeqCst);
    }

    /// Record received bytes.
    pub fn add_bytes(&self, bytes: u64) {
        self.current_bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    /// Forget bytes from a failed attempt.
    pub fn remove_bytes(&self, bytes: u64) {
        let _ = self
            .current_bytes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(bytes))
            });
    }

    /// Mark a bundle finished. Its contribution becomes exactly `file_size`
    /// regardless of how many bytes the fetcher reported.
    pub fn complete_file(&self, reported: u64, file_size: u64) {
        self.remove_bytes(reported);
        self.add_bytes(file_size);
        self.current_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> TransferProgress {
        TransferProgress {
            total_count: self.total_count.load(Ordering::SeqCst),
            current_count: self.current_count.load(Ordering::SeqCst),
            total_bytes: self.total_bytes.load(Ordering::SeqCst),
            current_bytes: self.current_bytes.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_by_bytes() {
        let progress = TransferProgress {
            total_count: 2,
            current_count: 0,
            total_bytes: 200,
            current_bytes: 50,
        };
        assert_eq!(progress.ratio(), 0.25);
    }

    #[test]
    fn test_ratio_falls_back_to_count() {
        let progress = TransferProgress {
            total_count: 4,
            current_count: 1,
            total_bytes: 0,
            current_bytes: 0,
        };
        assert_eq!(progress.ratio(), 0.25);
        assert_eq!(TransferProgress::default().ratio(), 1.0);
    }

    #[test]
    fn test_failed_attempt_rolls_back() {
        let counters = TransferCounters::new();
        counters.set_totals(1, 100);
        counters.add_bytes(40);
        counters.remove_bytes(40);
        counters.remove_bytes(10);
        assert_eq!(counters.snapshot().current_bytes, 0);
    }

    #[test]
    fn test_complete_file_uses_manifest_size() {
        let counters = TransferCounters::new();
        counters.set_totals(2, 300);
        counters.add_bytes(90);
        counters.complete_file(90, 100);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.current_count, 1);
        assert_eq!(snapshot.current_bytes, 100);
        assert_eq!(snapshot.total_count, 2);
    }
}

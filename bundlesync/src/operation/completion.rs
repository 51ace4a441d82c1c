//! Single-assignment completion state.

use std::task::Waker;

use super::error::{OperationError, OperationResult};

/// Observable state of an awaited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    /// No outcome latched yet.
    #[default]
    Pending,
    /// Latched a success.
    Succeeded,
    /// Latched an error.
    Faulted,
}

/// Holds at most one outcome plus the waker of the awaiting consumer.
///
/// The first `try_set_*` call wins; later calls return false and leave the
/// latched outcome untouched, even after it was taken.
pub struct CompletionCore<T> {
    status: TaskStatus,
    outcome: Option<OperationResult<T>>,
    waker: Option<Waker>,
}

impl<T> Default for CompletionCore<T> {
    fn default() -> Self {
        Self {
            status: TaskStatus::Pending,
            outcome: None,
            waker: None,
        }
    }
}

impl<T> CompletionCore<T> {
    /// Create an empty core.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns true once an outcome was latched.
    pub fn is_completed(&self) -> bool {
        self.status != TaskStatus::Pending
    }

    /// Latch a success value.
    pub fn try_set_result(&mut self, value: T) -> bool {
        self.latch(TaskStatus::Succeeded, Ok(value))
    }

    /// Latch an error.
    pub fn try_set_error(&mut self, error: OperationError) -> bool {
        self.latch(TaskStatus::Faulted, Err(error))
    }

    fn latch(&mut self, status: TaskStatus, outcome: OperationResult<T>) -> bool {
        if self.is_completed() {
            return false;
        }
        self.status = status;
        self.outcome = Some(outcome);
        true
    }

    /// Take the latched outcome. Returns `None` while pending or once taken.
    pub fn take_outcome(&mut self) -> Option<OperationResult<T>> {
        self.outcome.take()
    }

    /// Remember the consumer's waker.
    pub fn register_waker(&mut self, waker: &Waker) {
        match &self.waker {
            Some(existing) if existing.will_wake(waker) => {}
            _ => self.waker = Some(waker.clone()),
        }
    }

    /// Remove the stored waker so it can be woken outside any lock.
    pub fn take_waker(&mut self) -> Option<Waker> {
        self.waker.take()
    }

    /// Clear every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl<T> std::fmt::Debug for CompletionCore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionCore")
            .field("status", &self.status)
            .field("has_outcome", &self.outcome.is_some())
            .field("has_waker", &self.waker.is_some())
            .finish()
    }
}

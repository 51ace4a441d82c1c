//! Operation handle capability set.
//!
//! Every kind of loading handle (asset, scene, sub-assets, transfer) exposes
//! the same small surface: a completion notification, a terminal status, an
//! error message, a progress value and a validity flag. The bridge in
//! [`super::bridge`] is written once against [`OperationHandle`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// Lifecycle status of an operation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationStatus {
    /// Not started.
    #[default]
    None,
    /// Running.
    Processing,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
}

impl OperationStatus {
    /// Returns true for terminal statuses.
    pub fn is_done(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Identifies one completion subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Completion listener.
pub type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

/// Capability set shared by all operation handles.
pub trait OperationHandle: Send + Sync {
    /// Register a completion listener.
    ///
    /// If the handle already finished, the listener runs immediately on the
    /// calling thread.
    fn subscribe(&self, callback: CompletionCallback) -> SubscriptionId;

    /// Remove a completion listener. Returns false if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Current status.
    fn status(&self) -> OperationStatus;

    /// Error text when the status is [`OperationStatus::Failed`].
    fn last_error(&self) -> Option<String>;

    /// Progress in `[0.0, 1.0]`.
    fn progress(&self) -> f32;

    /// Returns false once the owner released the handle.
    fn is_valid(&self) -> bool;
}

// =============================================================================
// Completion event
// =============================================================================

#[derive(Default)]
struct EventState {
    fired: bool,
    listeners: Vec<(SubscriptionId, CompletionCallback)>,
}

/// One-shot completion event with by-id unsubscription.
///
/// Listeners are invoked outside the internal lock, so they may subscribe,
/// unsubscribe or query the owning handle.
#[derive(Default)]
pub struct CompletionEvent {
    next_id: AtomicU64,
    state: Mutex<EventState>,
}

impl CompletionEvent {
    /// Create an event that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, or run it now if the event already fired.
    pub fn subscribe(&self, callback: CompletionCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut state = self.state.lock();
            if !state.fired {
                state.listeners.push((id, callback));
                return id;
            }
        }
        callback();
        id
    }

    /// Remove a listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(listener, _)| *listener != id);
        state.listeners.len() != before
    }

    /// Fire the event once. Later calls do nothing.
    pub fn fire(&self) {
        let listeners = {
            let mut state = self.state.lock();
            if state.fired {
                return;
            }
            state.fired = true;
            std::mem::take(&mut state.listeners)
        };

        trace!(listeners = listeners.len(), "Completion event fired");
        for (_, callback) in listeners {
            callback();
        }
    }

    /// Returns true once [`fire`](Self::fire) ran.
    pub fn has_fired(&self) -> bool {
        self.state.lock().fired
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

impl fmt::Debug for CompletionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CompletionEvent")
            .field("fired", &state.fired)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

// =============================================================================
// Tracked handle
// =============================================================================

/// Kind of loading handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Single asset load.
    Asset,
    /// Scene load.
    Scene,
    /// Sub-asset batch load.
    SubAssets,
}

#[derive(Debug)]
struct HandleState {
    status: OperationStatus,
    progress: f32,
    last_error: Option<String>,
    valid: bool,
}

/// In-process operation handle driven by the loading system.
///
/// The owner reports progress and the terminal outcome; consumers observe it
/// through [`OperationHandle`]. Only the first terminal report counts.
#[derive(Debug)]
pub struct TrackedHandle {
    kind: HandleKind,
    location: String,
    state: Mutex<HandleState>,
    event: CompletionEvent,
}

impl TrackedHandle {
    /// Create a handle in the processing state.
    pub fn new(kind: HandleKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            state: Mutex::new(HandleState {
                status: OperationStatus::Processing,
                progress: 0.0,
                last_error: None,
                valid: true,
            }),
            event: CompletionEvent::new(),
        }
    }

    /// Handle kind.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Asset or scene location this handle loads.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Update progress. Values are clamped to `[0.0, 1.0]`.
    pub fn report_progress(&self, progress: f32) {
        let mut state = self.state.lock();
        if !state.status.is_done() {
            state.progress = progress.clamp(0.0, 1.0);
        }
    }

    /// Finish successfully. Returns false if the handle already finished.
    pub fn succeed(&self) -> bool {
        self.finish(OperationStatus::Succeeded, None)
    }

    /// Finish with an error. Returns false if the handle already finished.
    pub fn fail(&self, error: impl Into<String>) -> bool {
        self.finish(OperationStatus::Failed, Some(error.into()))
    }

    /// Invalidate the handle. Listeners are not notified.
    pub fn release(&self) {
        self.state.lock().valid = false;
    }

    fn finish(&self, status: OperationStatus, error: Option<String>) -> bool {
        {
            let mut state = self.state.lock();
            if state.status.is_done() {
                return false;
            }
            state.status = status;
            state.last_error = error;
            if status == OperationStatus::Succeeded {
                state.progress = 1.0;
            }
        }
        trace!(location = %self.location, kind = ?self.kind, %status, "Handle finished");
        self.event.fire();
        true
    }
}

impl OperationHandle for TrackedHandle {
    fn subscribe(&self, callback: CompletionCallback) -> SubscriptionId {
        self.event.subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.event.unsubscribe(id)
    }

    fn status(&self) -> OperationStatus {
        self.state.lock().status
    }

    fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    fn progress(&self) -> f32 {
        self.state.lock().progress
    }

    fn is_valid(&self) -> bool {
        self.state.lock().valid
    }
}

//! Pooled bridge from callback-driven handles to awaitable tasks.
//!
//! Each bridged handle occupies one [`HandleSlot`] drawn from a shared
//! [`SlotPool`]. The slot moves through three states:
//!
//! ```text
//! Pending ──handle fires──► Completed ──consumed / dropped──► Recycled
//!    │                                                          ▲
//!    └──────── task dropped, then next tick or callback ────────┘
//! ```
//!
//! The handle's completion callback and the slot poller only hold a weak
//! reference to the pool plus the slot token. Once the slot was recycled
//! both see a stale token and do nothing, so a late or duplicate
//! notification can never reach the slot's next occupant.
//!
//! Progress sinks run under the pool lock, after re-checking that the slot
//! has not completed. A sample therefore never follows the completion latch,
//! but a sink must not call back into the bridge or its pool.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use tracing::{debug, trace};

use super::completion::{CompletionCore, TaskStatus};
use super::error::{OperationError, OperationResult, StaleTokenError};
use super::handle::{OperationHandle, OperationStatus, SubscriptionId};
use super::pool::{PoolRegistry, Poolable, SlotPool, SlotToken};
use super::scheduler::{TickItem, TickScheduler};

/// Receives progress samples in `[0.0, 1.0]`.
pub type ProgressSink = Arc<dyn Fn(f32) + Send + Sync>;

/// Pool slot adapting one handle.
#[derive(Default)]
pub struct HandleSlot {
    handle: Option<Arc<dyn OperationHandle>>,
    progress: Option<ProgressSink>,
    subscription: Option<SubscriptionId>,
    abandoned: bool,
    core: CompletionCore<()>,
}

impl Poolable for HandleSlot {
    fn reset(&mut self) {
        self.handle = None;
        self.progress = None;
        self.subscription = None;
        self.abandoned = false;
        self.core.reset();
    }
}

/// Adapts [`OperationHandle`]s into [`OperationTask`]s.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bundlesync::operation::{
///     HandleKind, OperationBridge, PoolRegistry, TickScheduler, TrackedHandle,
/// };
///
/// # futures::executor::block_on(async {
/// let registry = PoolRegistry::new();
/// let bridge = OperationBridge::new(&registry, Arc::new(TickScheduler::new()));
///
/// let handle = Arc::new(TrackedHandle::new(HandleKind::Asset, "ui/menu.prefab"));
/// let task = bridge.to_task(handle.clone(), None);
///
/// handle.fail("network timeout");
/// let err = task.await.unwrap_err();
/// assert_eq!(err.to_string(), "network timeout");
/// # });
/// ```
#[derive(Clone)]
pub struct OperationBridge {
    pool: Arc<SlotPool<HandleSlot>>,
    scheduler: Arc<TickScheduler>,
}

impl OperationBridge {
    /// Create a bridge using the registry's [`HandleSlot`] pool.
    pub fn new(registry: &PoolRegistry, scheduler: Arc<TickScheduler>) -> Self {
        Self {
            pool: registry.pool::<HandleSlot>(),
            scheduler,
        }
    }

    /// The slot pool backing this bridge.
    pub fn pool(&self) -> &Arc<SlotPool<HandleSlot>> {
        &self.pool
    }

    /// The scheduler progress pollers are registered with.
    pub fn scheduler(&self) -> &Arc<TickScheduler> {
        &self.scheduler
    }

    /// Bridge `handle` into an awaitable task.
    ///
    /// An invalid handle yields an already completed task. When `progress`
    /// is given, the handle's progress is forwarded once per scheduler tick
    /// until the task completes.
    pub fn to_task(
        &self,
        handle: Arc<dyn OperationHandle>,
        progress: Option<ProgressSink>,
    ) -> OperationTask {
        if !handle.is_valid() {
            trace!("Bridging invalid handle, task completes immediately");
            return OperationTask::completed(Ok(()));
        }

        let polls_progress = progress.is_some();
        let token = self.pool.acquire(|slot| {
            slot.handle = Some(Arc::clone(&handle));
            slot.progress = progress;
        });

        if polls_progress {
            self.scheduler
                .add_action(Box::new(SlotPoller::new(&self.pool, token)));
        }

        let weak = Arc::downgrade(&self.pool);
        let id = handle.subscribe(Arc::new(move || {
            if let Some(pool) = weak.upgrade() {
                on_handle_completed(&pool, token);
            }
        }));

        // The handle may have fired during subscribe.
        let stored = self.pool.with(token, |slot| {
            if slot.core.is_completed() {
                false
            } else {
                slot.subscription = Some(id);
                true
            }
        });
        if !matches!(stored, Ok(true)) {
            handle.unsubscribe(id);
        }

        OperationTask {
            state: TaskState::Pending {
                pool: Arc::clone(&self.pool),
                scheduler: Arc::clone(&self.scheduler),
                token,
            },
        }
    }

    /// Status of the slot behind `token`.
    pub fn status(&self, token: SlotToken) -> Result<TaskStatus, StaleTokenError> {
        self.pool.with(token, |slot| slot.core.status())
    }

    /// Fetch the latched outcome and recycle the slot.
    ///
    /// Returns `None` while the slot is pending and a
    /// [`OperationError::Stale`] error once `token` was recycled.
    pub fn try_get_result(&self, token: SlotToken) -> Option<OperationResult<()>> {
        match self.pool.with(token, |slot| slot.core.take_outcome()) {
            Ok(Some(outcome)) => {
                let _ = self.pool.release(token);
                Some(outcome)
            }
            Ok(None) => None,
            Err(stale) => Some(Err(stale.into())),
        }
    }
}

impl fmt::Debug for OperationBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationBridge")
            .field("pool", &self.pool)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

fn on_handle_completed(pool: &SlotPool<HandleSlot>, token: SlotToken) {
    let Ok((handle, subscription)) =
        pool.with(token, |slot| (slot.handle.clone(), slot.subscription.take()))
    else {
        trace!(index = token.index(), "Completion for recycled slot ignored");
        return;
    };
    let Some(handle) = handle else {
        return;
    };

    if let Some(id) = subscription {
        handle.unsubscribe(id);
    }

    let status = handle.status();
    let error = handle.last_error();

    let latched = pool.with(token, |slot| {
        let fresh = if slot.core.is_completed() {
            false
        } else if status == OperationStatus::Failed {
            slot.core
                .try_set_error(OperationError::HandleFaulted(error.unwrap_or_default()))
        } else {
            slot.core.try_set_result(())
        };
        (fresh, slot.abandoned, slot.core.take_waker())
    });

    match latched {
        Ok((_, true, _)) => {
            trace!(index = token.index(), "Abandoned slot recycled on completion");
            let _ = pool.release(token);
        }
        Ok((true, false, waker)) => {
            if let Some(waker) = waker {
                waker.wake();
            }
        }
        Ok((false, false, _)) => {
            debug!(index = token.index(), "Duplicate completion ignored");
        }
        Err(_) => {}
    }
}

fn detach_and_release(pool: &SlotPool<HandleSlot>, token: SlotToken) {
    if let Ok((Some(handle), Some(id))) =
        pool.with(token, |slot| (slot.handle.clone(), slot.subscription.take()))
    {
        handle.unsubscribe(id);
    }
    let _ = pool.release(token);
}

/// Samples progress once per tick and reaps the slot once its task was
/// dropped.
struct SlotPoller {
    pool: Weak<SlotPool<HandleSlot>>,
    token: SlotToken,
}

impl SlotPoller {
    fn new(pool: &Arc<SlotPool<HandleSlot>>, token: SlotToken) -> Self {
        Self {
            pool: Arc::downgrade(pool),
            token,
        }
    }
}

impl TickItem for SlotPoller {
    fn move_next(&mut self) -> bool {
        let Some(pool) = self.pool.upgrade() else {
            return false;
        };

        let snapshot = pool.with(self.token, |slot| {
            if slot.core.is_completed() {
                None
            } else {
                Some((slot.handle.clone(), slot.abandoned))
            }
        });

        let handle = match snapshot {
            Ok(Some((_, true))) => {
                trace!(index = self.token.index(), "Abandoned slot recycled on tick");
                detach_and_release(&pool, self.token);
                return false;
            }
            Ok(Some((Some(handle), false))) => handle,
            _ => return false,
        };

        if !handle.is_valid() {
            return true;
        }
        let progress = handle.progress();

        // The handle may have completed since the snapshot.
        pool.with(self.token, |slot| match &slot.progress {
            Some(sink) if !slot.core.is_completed() => {
                sink(progress);
                true
            }
            _ => false,
        })
        .unwrap_or(false)
    }
}

enum TaskState {
    Completed(OperationResult<()>),
    Pending {
        pool: Arc<SlotPool<HandleSlot>>,
        scheduler: Arc<TickScheduler>,
        token: SlotToken,
    },
}

/// Awaitable result of a bridged handle.
///
/// Resolves to `Ok(())` when the handle succeeds and to
/// [`OperationError::HandleFaulted`] with the handle's error text when it
/// fails. Dropping the task without awaiting it leaves the handle running
/// and recycles the slot on the next tick or completion callback.
pub struct OperationTask {
    state: TaskState,
}

impl OperationTask {
    /// A task that is already finished.
    pub fn completed(outcome: OperationResult<()>) -> Self {
        Self {
            state: TaskState::Completed(outcome),
        }
    }

    /// Slot token, if the task occupies a pool slot.
    pub fn token(&self) -> Option<SlotToken> {
        match &self.state {
            TaskState::Pending { token, .. } => Some(*token),
            TaskState::Completed(_) => None,
        }
    }

    /// Current status.
    pub fn status(&self) -> Result<TaskStatus, StaleTokenError> {
        match &self.state {
            TaskState::Completed(Ok(())) => Ok(TaskStatus::Succeeded),
            TaskState::Completed(Err(_)) => Ok(TaskStatus::Faulted),
            TaskState::Pending { pool, token, .. } => {
                pool.with(*token, |slot| slot.core.status())
            }
        }
    }
}

impl Future for OperationTask {
    type Output = OperationResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            TaskState::Completed(outcome) => Poll::Ready(outcome.clone()),
            TaskState::Pending { pool, token, .. } => {
                let polled = pool.with(*token, |slot| match slot.core.take_outcome() {
                    Some(outcome) => Some(outcome),
                    None => {
                        slot.core.register_waker(cx.waker());
                        None
                    }
                });

                match polled {
                    Ok(Some(outcome)) => {
                        let _ = pool.release(*token);
                        Poll::Ready(outcome)
                    }
                    Ok(None) => Poll::Pending,
                    Err(stale) => Poll::Ready(Err(stale.into())),
                }
            }
        }
    }
}

impl Drop for OperationTask {
    fn drop(&mut self) {
        let TaskState::Pending {
            pool,
            scheduler,
            token,
        } = &self.state
        else {
            return;
        };

        let marked = pool.with(*token, |slot| {
            slot.abandoned = true;
            (
                slot.core.is_completed(),
                slot.handle.clone(),
                slot.progress.is_some(),
            )
        });

        match marked {
            Ok((true, _, _)) => {
                let _ = pool.release(*token);
            }
            Ok((false, Some(handle), _)) if !handle.is_valid() => {
                detach_and_release(pool, *token);
            }
            Ok((false, _, polled)) => {
                // Slots without a progress poller get one so a handle that is
                // released without completing is still reaped.
                if !polled {
                    scheduler.add_action(Box::new(SlotPoller::new(pool, *token)));
                }
                trace!(index = token.index(), "Pending task dropped");
            }
            Err(_) => {}
        }
    }
}

impl fmt::Debug for OperationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTask")
            .field("token", &self.token())
            .field("status", &self.status())
            .finish()
    }
}

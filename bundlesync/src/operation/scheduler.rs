//! Cooperative tick scheduler.
//!
//! Items registered with [`TickScheduler::add_action`] are advanced once per
//! [`tick`](TickScheduler::tick) until they report they are done. The
//! scheduler can be ticked by hand (tests, embedding in a host loop) or by
//! [`TickScheduler::run`] on a tokio interval.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default tick interval (roughly one frame at 60 Hz).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// A unit of work advanced once per tick.
pub trait TickItem: Send {
    /// Advance one step. Return false to be removed.
    fn move_next(&mut self) -> bool;
}

/// Configuration for the tokio-driven tick loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between ticks.
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick interval. Zero is raised to one millisecond.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }
}

/// Holds tick items and advances them.
#[derive(Default)]
pub struct TickScheduler {
    items: Mutex<Vec<Box<dyn TickItem>>>,
}

impl TickScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item. It is first advanced on the next tick.
    pub fn add_action(&self, item: Box<dyn TickItem>) {
        self.items.lock().push(item);
    }

    /// Advance every registered item once.
    ///
    /// Items run outside the internal lock, so they may register new items;
    /// those are kept and first advanced on the following tick.
    pub fn tick(&self) {
        let current = std::mem::take(&mut *self.items.lock());
        if current.is_empty() {
            return;
        }

        let before = current.len();
        let mut survivors: Vec<Box<dyn TickItem>> = Vec::with_capacity(before);
        for mut item in current {
            if item.move_next() {
                survivors.push(item);
            }
        }
        trace!(before, after = survivors.len(), "Scheduler tick");

        let mut items = self.items.lock();
        let added = std::mem::replace(&mut *items, survivors);
        items.extend(added);
    }

    /// Number of registered items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tick on a fixed interval until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, config: SchedulerConfig, shutdown: CancellationToken) {
        debug!(interval_ms = config.tick_interval.as_millis() as u64, "Tick scheduler starting");

        let mut interval = tokio::time::interval(config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    break;
                }

                _ = interval.tick() => {
                    self.tick();
                }
            }
        }

        debug!("Tick scheduler stopped");
    }

    /// Spawn [`run`](Self::run) on the current tokio runtime.
    pub fn spawn(self: &Arc<Self>, config: SchedulerConfig, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(config, shutdown))
    }
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickScheduler")
            .field("items", &self.len())
            .finish()
    }
}

//! Async operation core.
//!
//! Bridges callback-driven operation handles into awaitable tasks without a
//! heap allocation per await:
//!
//! ```text
//! ┌──────────────────┐  subscribe   ┌───────────────────────────────┐
//! │ OperationHandle  │◄─────────────│        OperationBridge        │
//! │ (asset, scene,   │              │                               │
//! │  sub-assets,     │── fires ────►│  SlotPool<HandleSlot>         │
//! │  transfer)       │              │   ├─ CompletionCore (latch)   │
//! └──────────────────┘              │   └─ generation token         │
//!          ▲                        └───────────────┬───────────────┘
//!          │ progress()                             │ OperationTask
//!   ┌──────┴────────┐                               ▼
//!   │ TickScheduler │──► ProgressSink          consumer .await
//!   └───────────────┘
//! ```
//!
//! Slots are recycled once their result is consumed or their task is
//! dropped; a recycled slot bumps its generation so stale tokens are
//! rejected with [`StaleTokenError`].

mod bridge;
mod completion;
mod error;
mod handle;
mod pool;
mod scheduler;

pub use bridge::{HandleSlot, OperationBridge, OperationTask, ProgressSink};
pub use completion::{CompletionCore, TaskStatus};
pub use error::{OperationError, OperationResult, StaleTokenError};
pub use handle::{
    CompletionCallback, CompletionEvent, HandleKind, OperationHandle, OperationStatus,
    SubscriptionId, TrackedHandle,
};
pub use pool::{PoolRegistry, Poolable, SlotPool, SlotToken};
pub use scheduler::{SchedulerConfig, TickItem, TickScheduler, DEFAULT_TICK_INTERVAL};

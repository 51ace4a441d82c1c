//! bundlesync - versioned asset bundle resolution and download orchestration.
//!
//! The crate resolves which content-addressed bundles a set of assets needs,
//! decides which of them must be fetched, and exposes fetch and load
//! lifecycles as awaitable operations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────┐   ┌────────────────────┐
//! │   manifest   │──►│       resolver        │──►│      transfer      │
//! │ (graph +     │   │ locality + download   │   │ TransferOperation  │
//! │  builder)    │   │ list + URL mapping    │   │ + BundleFetcher    │
//! └──────────────┘   └───────────┬───────────┘   └─────────┬──────────┘
//!                                │                         │ OperationHandle
//!                    ┌───────────┴───────────┐   ┌─────────▼──────────┐
//!                    │       services        │   │     operation      │
//!                    │ build-in query, hosts │   │ pooled bridge to   │
//!                    └───────────────────────┘   │ awaitable tasks    │
//!                                                └────────────────────┘
//! ```
//!
//! [`playmode::WebPlayMode`] ties these together for one package.

pub mod logging;
pub mod manifest;
pub mod operation;
pub mod playmode;
pub mod resolver;
pub mod services;
pub mod transfer;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Play-mode services.
//!
//! A play mode ties a package's active manifest to the resolver and the
//! transfer orchestrator, and answers per-asset bundle queries for the
//! loading system.

mod error;
mod web;

pub use error::{PlayModeError, PlayModeResult};
pub use web::WebPlayMode;

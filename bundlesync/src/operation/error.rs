//! Error types for awaited operations.

use thiserror::Error;

/// Result type for awaited operations.
pub type OperationResult<T> = Result<T, OperationError>;

/// A slot token no longer matches the slot's generation.
///
/// The slot was recycled (and possibly handed to another consumer) after the
/// token was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "stale slot token: slot {index} was issued at generation {token_generation}, \
     slot is now at generation {current_generation}"
)]
pub struct StaleTokenError {
    /// Slot index in the pool arena.
    pub index: usize,
    /// Generation recorded in the token.
    pub token_generation: u64,
    /// Generation the slot is currently at.
    pub current_generation: u64,
}

/// Errors surfaced to the consumer of an awaited operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The underlying handle finished with a failed status.
    ///
    /// Displays the handle's error text unmodified.
    #[error("{0}")]
    HandleFaulted(String),

    /// Access through a recycled slot token.
    #[error(transparent)]
    Stale(#[from] StaleTokenError),
}

impl OperationError {
    /// Returns true for stale-token errors.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

//! Error types reported by remote store implementations.

use crate::TaskId;
use thiserror::Error;

/// Errors surfaced by a remote store.
///
/// `Clone` so subscription failures can be fanned out to every registered
/// error observer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Subscription or network failure. Non-fatal: the canonical
    /// collection is left unchanged when a snapshot delivery fails.
    #[error("transport error: {0}")]
    Transport(String),

    /// The targeted document does not exist at the store.
    #[error("document not found: {0}")]
    NotFound(TaskId),

    /// The store rejected an add or update.
    #[error("write rejected: {0}")]
    Write(String),
}

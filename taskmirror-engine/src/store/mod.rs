//! Remote store abstraction for taskmirror.
//!
//! This module provides a pluggable store layer that abstracts the
//! remote document collection (a network-backed store in production, the
//! deterministic [`MemoryStore`] in tests and local use).
//!
//! # Contract
//!
//! - `subscribe()` registers a continuous listener; snapshots arrive in
//!   transport delivery order for as long as the [`Subscription`] lives.
//!   A `Failure` item means "no change to canonical state", never
//!   "empty collection".
//! - `add_document()` persists a new record without requiring or
//!   producing an id; the identifier is discovered via a later snapshot.
//! - `update_document()` applies a [`TaskPatch`] to a stored record and
//!   fails with `NotFound` if the id is unknown.
//! - `delete_document()` removes a record; deleting an unknown id yields
//!   `NotFound`, which the engine treats as success.
//!
//! There is no ordering guarantee between a mutation's outcome and any
//! particular subsequent snapshot; consistency is eventual.

mod memory;

pub use memory::{MemoryStore, StoreOp};

use async_trait::async_trait;
use taskmirror_types::{StoreError, Task, TaskId, TaskPatch};
use tokio::sync::mpsc;

/// One delivered snapshot: the full remote collection, or a transport
/// failure that leaves the previous state authoritative.
pub type SnapshotResult = Result<Vec<Task>, StoreError>;

/// A live subscription to a remote collection.
///
/// Dropping the subscription detaches the listener: the store observes
/// the closed channel and stops delivering. An item already in flight at
/// that moment may still have been queued; it is discarded unread.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<SnapshotResult>,
}

impl Subscription {
    /// Wrap a receiver handed out by a store implementation.
    pub fn new(rx: mpsc::UnboundedReceiver<SnapshotResult>) -> Self {
        Self { rx }
    }

    /// Wait for the next snapshot. Returns `None` once the store side
    /// has shut down.
    pub async fn next(&mut self) -> Option<SnapshotResult> {
        self.rx.recv().await
    }
}

/// The remote store capability set.
///
/// Any conforming implementation is interchangeable; the engine never
/// assumes anything beyond this contract.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// Register a continuous snapshot listener.
    async fn subscribe(&self) -> Result<Subscription, StoreError>;

    /// Persist a new record. `task.id` is ignored; the store assigns ids.
    async fn add_document(&self, task: Task) -> Result<(), StoreError>;

    /// Apply a partial update to the record with the given id.
    async fn update_document(&self, id: &TaskId, patch: TaskPatch) -> Result<(), StoreError>;

    /// Delete the record with the given id.
    async fn delete_document(&self, id: &TaskId) -> Result<(), StoreError>;
}

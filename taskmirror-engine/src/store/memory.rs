//! Deterministic in-memory store.
//!
//! A complete multi-writer [`TaskStore`] with no network: every mutation
//! broadcasts a fresh snapshot to all live subscribers, so several
//! engines sharing one store observe each other's writes. Doubles as the
//! test double - calls are recorded in an op log, failures can be forced
//! one-shot, and arbitrary snapshots (or failures) can be injected.

use super::{SnapshotResult, Subscription, TaskStore};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use taskmirror_types::{StoreError, Task, TaskId, TaskPatch};
use tokio::sync::mpsc;

/// A recorded adapter call, for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// `subscribe` was called.
    Subscribe,
    /// `add_document` was called with this task.
    Add(Task),
    /// `update_document` was called with this id and patch.
    Update(TaskId, TaskPatch),
    /// `delete_document` was called with this id.
    Delete(TaskId),
}

/// In-memory multi-writer store.
///
/// `Clone` shares state: clones are handles onto the same collection,
/// which is how multiple engines attach to one store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    docs: Vec<Task>,
    subscribers: Vec<mpsc::UnboundedSender<SnapshotResult>>,
    ops: Vec<StoreOp>,
    fail_next_add: Option<String>,
    fail_next_update: Option<String>,
    fail_next_delete: Option<String>,
}

impl Inner {
    /// Deliver the current collection to every live subscriber,
    /// pruning the ones whose subscription has been dropped.
    fn broadcast(&mut self) {
        let snapshot = self.docs.clone();
        self.subscribers
            .retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing the adapter surface.
    ///
    /// Assigns and returns the id without notifying subscribers or
    /// touching the op log; models state that existed before the client
    /// connected.
    pub fn insert(&self, mut task: Task) -> TaskId {
        let id = task
            .id
            .clone()
            .unwrap_or_else(|| TaskId::new(uuid::Uuid::new_v4().to_string()));
        task.id = Some(id.clone());
        let mut inner = self.inner.lock().unwrap();
        inner.docs.push(task);
        id
    }

    /// Current store contents.
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.lock().unwrap().docs.clone()
    }

    /// All adapter calls made so far.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.inner.lock().unwrap().ops.clone()
    }

    /// Number of live subscribers (closed ones are pruned lazily, on the
    /// next broadcast).
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }

    /// Push an arbitrary snapshot or failure to all subscribers without
    /// changing the stored collection.
    pub fn emit_snapshot(&self, snapshot: SnapshotResult) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Cause the next `add_document` to fail with the given error.
    pub fn fail_next_add(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_add = Some(error.to_string());
    }

    /// Cause the next `update_document` to fail with the given error.
    pub fn fail_next_update(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_update = Some(error.to_string());
    }

    /// Cause the next `delete_document` to fail with the given error.
    pub fn fail_next_delete(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_delete = Some(error.to_string());
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(StoreOp::Subscribe);

        // A new listener immediately sees the current collection.
        let _ = tx.send(Ok(inner.docs.clone()));
        inner.subscribers.push(tx);
        Ok(Subscription::new(rx))
    }

    async fn add_document(&self, mut task: Task) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(StoreOp::Add(task.clone()));

        if let Some(error) = inner.fail_next_add.take() {
            return Err(StoreError::Write(error));
        }

        task.id = Some(TaskId::new(uuid::Uuid::new_v4().to_string()));
        inner.docs.push(task);
        inner.broadcast();
        Ok(())
    }

    async fn update_document(&self, id: &TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(StoreOp::Update(id.clone(), patch.clone()));

        if let Some(error) = inner.fail_next_update.take() {
            return Err(StoreError::Write(error));
        }

        let Some(doc) = inner
            .docs
            .iter_mut()
            .find(|t| t.id.as_ref() == Some(id))
        else {
            return Err(StoreError::NotFound(id.clone()));
        };
        patch.apply_to(doc);
        inner.broadcast();
        Ok(())
    }

    async fn delete_document(&self, id: &TaskId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(StoreOp::Delete(id.clone()));

        if let Some(error) = inner.fail_next_delete.take() {
            return Err(StoreError::Transport(error));
        }

        let before = inner.docs.len();
        inner.docs.retain(|t| t.id.as_ref() != Some(id));
        if inner.docs.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        inner.broadcast();
        Ok(())
    }
}

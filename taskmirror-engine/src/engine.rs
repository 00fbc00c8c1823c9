//! The synchronization engine.
//!
//! [`SyncEngine`] owns the canonical task collection, drives the
//! subscription lifecycle, and exposes the mutation entry points.
//!
//! # Consistency model
//!
//! Full-replace reconciliation: every snapshot the store delivers
//! replaces the canonical collection wholesale. The canonical collection
//! is therefore always an exact mirror of the last-seen remote snapshot;
//! local optimistic state is deliberately discarded, trading perceived
//! latency for the guarantee that observers never see phantom or
//! duplicate entries. A mutation's effect is visible only through a
//! later snapshot, never through the mutation call itself.
//!
//! A single forwarding task is the sole writer of the canonical state,
//! so snapshot application is serialized in delivery order. Observers
//! watch a `tokio::sync::watch` channel; a slow observer may skip
//! intermediate snapshots but always converges on the latest and never
//! sees them out of order.

use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use taskmirror_core::reconcile;
use taskmirror_types::{NoteChange, StoreError, Task, TaskPatch};

use crate::config::EngineConfig;
use crate::store::TaskStore;

/// Engine errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A task must have a non-empty title to be added.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task has no id: it was never persisted and cannot be targeted.
    #[error("task has not been persisted yet (no id)")]
    MissingId,

    /// The store rejected the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// The synchronization engine.
///
/// Generic over the store so production and test implementations are
/// interchangeable behind [`TaskStore`].
pub struct SyncEngine<S: TaskStore> {
    config: EngineConfig,
    store: S,
    canonical: watch::Sender<Vec<Task>>,
    errors: broadcast::Sender<StoreError>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S: TaskStore> SyncEngine<S> {
    /// Create a new engine. No subscription exists until [`start`] is
    /// called.
    ///
    /// [`start`]: SyncEngine::start
    pub fn new(config: EngineConfig, store: S) -> Self {
        let (canonical, _) = watch::channel(Vec::new());
        let (errors, _) = broadcast::channel(config.error_capacity.max(1));
        Self {
            config,
            store,
            canonical,
            errors,
            worker: Mutex::new(None),
        }
    }

    /// Start mirroring the remote collection. Idempotent: if a
    /// subscription is already active this is a no-op.
    pub async fn start(&self) -> Result<(), EngineError> {
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.as_ref() {
            if !handle.is_finished() {
                debug!(client = %self.config.client_name, "already started");
                return Ok(());
            }
        }

        let mut subscription = self.store.subscribe().await?;
        let canonical = self.canonical.clone();
        let errors = self.errors.clone();
        let client = self.config.client_name.clone();

        *worker = Some(tokio::spawn(async move {
            while let Some(item) = subscription.next().await {
                match item {
                    Ok(snapshot) => {
                        let clean = reconcile::sanitize(snapshot);
                        let changes = {
                            let current = canonical.borrow();
                            reconcile::diff(&current, &clean)
                        };
                        debug!(
                            client = %client,
                            added = changes.added.len(),
                            updated = changes.updated.len(),
                            removed = changes.removed.len(),
                            total = clean.len(),
                            "applied snapshot"
                        );
                        canonical.send_replace(clean);
                    }
                    Err(err) => {
                        // Canonical state stays untouched: a failed
                        // delivery is not an empty collection.
                        warn!(client = %client, error = %err, "snapshot delivery failed");
                        let _ = errors.send(err);
                    }
                }
            }
            debug!(client = %client, "subscription stream ended");
        }));
        Ok(())
    }

    /// Stop mirroring. After this returns, no further snapshot
    /// notifications are delivered. The engine can be started again.
    pub async fn stop(&self) {
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            // Wait for the forwarding task to actually terminate so the
            // no-notifications-after-teardown guarantee holds.
            let _ = handle.await;
            debug!(client = %self.config.client_name, "stopped");
        }
    }

    /// Whether a subscription is currently active.
    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Watch the canonical collection. Every snapshot replacement is
    /// published to every receiver.
    pub fn watch_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.canonical.subscribe()
    }

    /// A clone of the current canonical collection.
    pub fn tasks(&self) -> Vec<Task> {
        self.canonical.borrow().clone()
    }

    /// Observe subscription errors. Mutation errors are returned to the
    /// caller instead; only snapshot delivery failures arrive here.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<StoreError> {
        self.errors.subscribe()
    }

    /// Create a task.
    ///
    /// Rejects an empty title before any store call. An empty note is
    /// normalized to no note. The new task reaches the canonical
    /// collection only via a later snapshot, id assigned by the store.
    pub async fn add_task(
        &self,
        title: impl Into<String>,
        category: impl Into<String>,
        note: Option<String>,
    ) -> Result<(), EngineError> {
        let title = title.into();
        if title.is_empty() {
            return Err(EngineError::EmptyTitle);
        }
        let note = note.filter(|n| !n.is_empty());

        let task = Task::new(title, category, note);
        self.store.add_document(task).await.map_err(|err| {
            warn!(client = %self.config.client_name, error = %err, "add rejected by store");
            EngineError::from(err)
        })
    }

    /// Rename a task and optionally change its note.
    ///
    /// Rejects a task with no id before any store call. The note
    /// tri-state distinguishes "leave untouched", "set", and "clear";
    /// `NoteChange::from_legacy` maps the plain `Option<String>`
    /// convention. A `NotFound` from the store surfaces to the caller.
    pub async fn update_task(
        &self,
        task: &Task,
        new_title: impl Into<String>,
        note: NoteChange,
    ) -> Result<(), EngineError> {
        let id = task.id.as_ref().ok_or(EngineError::MissingId)?;
        let patch = TaskPatch::rename(new_title).with_note(note);

        self.store.update_document(id, patch).await.map_err(|err| {
            warn!(client = %self.config.client_name, %id, error = %err, "update rejected by store");
            EngineError::from(err)
        })
    }

    /// Delete a task.
    ///
    /// Rejects a task with no id before any store call. Deletion is
    /// idempotent: a `NotFound` from the store means the record is
    /// already gone and is reported as success.
    pub async fn delete_task(&self, task: &Task) -> Result<(), EngineError> {
        let id = task.id.as_ref().ok_or(EngineError::MissingId)?;

        match self.store.delete_document(id).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => {
                debug!(client = %self.config.client_name, %id, "delete target already absent");
                Ok(())
            }
            Err(err) => {
                warn!(client = %self.config.client_name, %id, error = %err, "delete rejected by store");
                Err(err.into())
            }
        }
    }

    /// Get a reference to the underlying store (for testing).
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreOp};
    use std::time::Duration;
    use taskmirror_core::{PhaseTracker, TaskPhase};
    use taskmirror_types::TaskId;
    use tokio::time::{sleep, timeout};

    fn engine_on(store: &MemoryStore) -> SyncEngine<MemoryStore> {
        SyncEngine::new(EngineConfig::new().with_client_name("test"), store.clone())
    }

    /// Wait until the canonical collection satisfies a condition.
    async fn wait_for(
        rx: &mut watch::Receiver<Vec<Task>>,
        cond: impl Fn(&[Task]) -> bool,
    ) -> Vec<Task> {
        timeout(Duration::from_secs(1), async {
            loop {
                {
                    let current = rx.borrow_and_update();
                    if cond(&current) {
                        return current.clone();
                    }
                }
                rx.changed().await.expect("engine dropped the watch channel");
            }
        })
        .await
        .expect("canonical state never reached the expected condition")
    }

    // ===========================================
    // Subscription Lifecycle Tests
    // ===========================================

    #[tokio::test]
    async fn start_is_idempotent() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);

        engine.start().await.unwrap();
        engine.start().await.unwrap();
        engine.start().await.unwrap();

        assert_eq!(store.subscriber_count(), 1);
        let subscribes = store
            .ops()
            .iter()
            .filter(|op| **op == StoreOp::Subscribe)
            .count();
        assert_eq!(subscribes, 1);
        assert!(engine.is_running().await);
    }

    #[tokio::test]
    async fn initial_snapshot_mirrors_preexisting_store() {
        let store = MemoryStore::new();
        store.insert(Task::new("already there", "Work", None));
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();

        engine.start().await.unwrap();

        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;
        assert_eq!(tasks[0].title, "already there");
    }

    #[tokio::test]
    async fn stop_delivers_no_further_notifications() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();

        engine.start().await.unwrap();
        wait_for(&mut rx, |t| t.is_empty()).await; // initial snapshot

        engine.stop().await;
        assert!(!engine.is_running().await);

        store.emit_snapshot(Ok(vec![Task::persisted("1", "late", "", None)]));
        sleep(Duration::from_millis(50)).await;

        assert!(!rx.has_changed().unwrap());
        assert!(engine.tasks().is_empty());
    }

    #[tokio::test]
    async fn engine_restarts_after_stop() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);

        engine.start().await.unwrap();
        engine.stop().await;
        engine.start().await.unwrap();

        let mut rx = engine.watch_tasks();
        store.add_document(Task::new("after restart", "", None)).await.unwrap();
        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;
        assert_eq!(tasks[0].title, "after restart");
    }

    // ===========================================
    // Add Tests
    // ===========================================

    #[tokio::test]
    async fn add_task_round_trip() {
        // The add carries no id; the snapshot brings the task back with
        // a store-assigned one.
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();

        engine.add_task("Buy milk", "Home", None).await.unwrap();

        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;
        assert!(tasks[0].is_persisted());
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].category, "Home");
        assert_eq!(tasks[0].note, None);

        let ops = store.ops();
        assert!(ops
            .iter()
            .any(|op| matches!(op, StoreOp::Add(t) if t.id.is_none())));
    }

    #[tokio::test]
    async fn add_with_empty_title_never_reaches_store() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);

        let result = engine.add_task("", "Home", None).await;

        assert_eq!(result, Err(EngineError::EmptyTitle));
        assert!(store.ops().is_empty());
    }

    #[tokio::test]
    async fn add_normalizes_empty_note_to_absent() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);

        engine
            .add_task("Buy milk", "Home", Some(String::new()))
            .await
            .unwrap();

        let ops = store.ops();
        assert!(matches!(&ops[0], StoreOp::Add(t) if t.note.is_none()));
    }

    #[tokio::test]
    async fn add_failure_surfaces_and_leaves_canonical_untouched() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();
        wait_for(&mut rx, |t| t.is_empty()).await;

        store.fail_next_add("quota exceeded");
        let result = engine.add_task("Buy milk", "Home", None).await;

        assert!(matches!(result, Err(EngineError::Store(StoreError::Write(_)))));
        assert!(engine.tasks().is_empty());
    }

    // ===========================================
    // Update Tests
    // ===========================================

    #[tokio::test]
    async fn update_sends_patch_and_snapshot_reflects_it() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();

        engine.add_task("Buy milk", "Home", None).await.unwrap();
        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;

        engine
            .update_task(
                &tasks[0],
                "Buy oat milk",
                NoteChange::Set("urgent".into()),
            )
            .await
            .unwrap();

        let tasks = wait_for(&mut rx, |t| {
            t.len() == 1 && t[0].title == "Buy oat milk"
        })
        .await;
        assert_eq!(tasks[0].note.as_deref(), Some("urgent"));

        let ops = store.ops();
        assert!(ops.iter().any(|op| matches!(
            op,
            StoreOp::Update(_, patch)
                if patch.title == "Buy oat milk"
                    && patch.note == NoteChange::Set("urgent".into())
        )));
    }

    #[tokio::test]
    async fn update_with_unchanged_note_leaves_note() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();

        engine
            .add_task("Buy milk", "Home", Some("2%".into()))
            .await
            .unwrap();
        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;

        engine
            .update_task(&tasks[0], "Buy oat milk", NoteChange::Unchanged)
            .await
            .unwrap();

        let tasks = wait_for(&mut rx, |t| {
            t.len() == 1 && t[0].title == "Buy oat milk"
        })
        .await;
        assert_eq!(tasks[0].note.as_deref(), Some("2%"));
    }

    #[tokio::test]
    async fn update_can_clear_note() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();

        engine
            .add_task("Buy milk", "Home", Some("2%".into()))
            .await
            .unwrap();
        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;

        engine
            .update_task(&tasks[0], "Buy milk", NoteChange::Clear)
            .await
            .unwrap();

        let tasks = wait_for(&mut rx, |t| t.len() == 1 && t[0].note.is_none()).await;
        assert_eq!(tasks[0].title, "Buy milk");
    }

    #[tokio::test]
    async fn update_without_id_never_reaches_store() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let unpersisted = Task::new("never saved", "", None);

        let result = engine
            .update_task(&unpersisted, "renamed", NoteChange::Unchanged)
            .await;

        assert_eq!(result, Err(EngineError::MissingId));
        assert!(store.ops().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_target_surfaces_not_found() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let ghost = Task::persisted("ghost", "gone", "", None);

        let result = engine
            .update_task(&ghost, "renamed", NoteChange::Unchanged)
            .await;

        assert_eq!(
            result,
            Err(EngineError::Store(StoreError::NotFound(TaskId::new("ghost"))))
        );
    }

    // ===========================================
    // Delete Tests
    // ===========================================

    #[tokio::test]
    async fn delete_round_trip() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();

        engine.add_task("Buy milk", "Home", None).await.unwrap();
        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;

        engine.delete_task(&tasks[0]).await.unwrap();

        wait_for(&mut rx, |t| t.is_empty()).await;
        let ops = store.ops();
        assert!(ops.iter().any(|op| matches!(op, StoreOp::Delete(_))));
    }

    #[tokio::test]
    async fn delete_without_id_never_reaches_store() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let unpersisted = Task::new("never saved", "", None);

        let result = engine.delete_task(&unpersisted).await;

        assert_eq!(result, Err(EngineError::MissingId));
        assert!(store.ops().is_empty());
    }

    #[tokio::test]
    async fn delete_of_absent_id_is_success() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let ghost = Task::persisted("ghost", "gone", "", None);

        assert_eq!(engine.delete_task(&ghost).await, Ok(()));
        // And deleting twice behaves the same.
        assert_eq!(engine.delete_task(&ghost).await, Ok(()));
    }

    #[tokio::test]
    async fn delete_transport_failure_surfaces() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();
        engine.add_task("Buy milk", "Home", None).await.unwrap();
        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;

        store.fail_next_delete("connection reset");
        let result = engine.delete_task(&tasks[0]).await;

        assert!(matches!(
            result,
            Err(EngineError::Store(StoreError::Transport(_)))
        ));
    }

    // ===========================================
    // Reconciliation Tests
    // ===========================================

    #[tokio::test]
    async fn snapshots_replace_wholesale() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();
        wait_for(&mut rx, |t| t.is_empty()).await;

        store.emit_snapshot(Ok(vec![Task::persisted("1", "A", "", None)]));
        wait_for(&mut rx, |t| t.len() == 1 && t[0].title == "A").await;

        store.emit_snapshot(Ok(vec![Task::persisted("2", "B", "", None)]));
        let tasks = wait_for(&mut rx, |t| t.len() == 1 && t[0].title == "B").await;

        assert_eq!(tasks[0].id, Some(TaskId::new("2")));
    }

    #[tokio::test]
    async fn delivery_failure_leaves_canonical_unchanged() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        let mut errors = engine.subscribe_errors();
        engine.start().await.unwrap();

        store.emit_snapshot(Ok(vec![Task::persisted("1", "A", "", None)]));
        wait_for(&mut rx, |t| t.len() == 1).await;

        store.emit_snapshot(Err(StoreError::Transport("listener dropped".into())));

        let err = timeout(Duration::from_secs(1), errors.recv())
            .await
            .expect("no error observed")
            .unwrap();
        assert!(matches!(err, StoreError::Transport(_)));

        // No empty-collection notification was published.
        assert!(!rx.has_changed().unwrap());
        assert_eq!(engine.tasks().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_and_idless_tasks_are_sanitized() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();

        store.emit_snapshot(Ok(vec![
            Task::persisted("1", "old", "", None),
            Task::new("transient", "", None),
            Task::persisted("1", "new", "", None),
            Task::persisted("2", "B", "", None),
        ]));

        let tasks = wait_for(&mut rx, |t| t.len() == 2).await;
        assert_eq!(tasks[0].id, Some(TaskId::new("1")));
        assert_eq!(tasks[0].title, "new");
        assert_eq!(tasks[1].id, Some(TaskId::new("2")));
    }

    // ===========================================
    // Multi-Writer Tests
    // ===========================================

    #[tokio::test]
    async fn two_engines_observe_each_others_writes() {
        let store = MemoryStore::new();
        let writer = engine_on(&store);
        let reader = engine_on(&store);
        writer.start().await.unwrap();
        reader.start().await.unwrap();
        let mut rx = reader.watch_tasks();

        writer.add_task("shared task", "Work", None).await.unwrap();

        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;
        assert_eq!(tasks[0].title, "shared task");
    }

    // ===========================================
    // Observed Lifecycle Tests
    // ===========================================

    #[tokio::test]
    async fn observer_sees_pending_persisted_deleted() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.watch_tasks();
        engine.start().await.unwrap();

        let mut tracker = PhaseTracker::new();

        engine.add_task("Buy milk", "Home", None).await.unwrap();
        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;
        let id = tasks[0].id.clone().unwrap();
        tracker.on_snapshot(&tasks);
        assert_eq!(tracker.phase(&id), TaskPhase::Persisted);

        engine.delete_task(&tasks[0]).await.unwrap();
        let tasks = wait_for(&mut rx, |t| t.is_empty()).await;
        tracker.on_snapshot(&tasks);
        assert_eq!(tracker.phase(&id), TaskPhase::Deleted);
    }

    // ===========================================
    // Store Access Tests
    // ===========================================

    #[tokio::test]
    async fn store_accessible_for_testing() {
        let store = MemoryStore::new();
        let engine = engine_on(&store);
        assert!(engine.store().tasks().is_empty());
    }
}

//! Observed task lifecycle across snapshots.
//!
//! A task, as seen by a client, moves through three phases: a local add
//! has been issued but no snapshot has acknowledged it yet (`Pending`),
//! the task appears in the canonical collection with an id
//! (`Persisted`), and a later snapshot omits it (`Deleted`). No
//! transition skips `Persisted`: a task can only be updated or deleted
//! once its id is known, and the id is only knowable from a snapshot.
//!
//! The phase transition is a pure function of the current phase and one
//! observation ("was the id present in this snapshot"); [`PhaseTracker`]
//! folds it over snapshots for every id it has ever seen.

use std::collections::HashMap;
use taskmirror_types::{Task, TaskId};

/// The lifecycle phase of a task as observed through snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskPhase {
    /// Add issued locally, not yet acknowledged by any snapshot.
    #[default]
    Pending,
    /// Present in the canonical collection with a store-assigned id.
    Persisted,
    /// Previously persisted, absent from a subsequent snapshot.
    Deleted,
}

impl TaskPhase {
    /// Fold one snapshot observation into the phase.
    ///
    /// Pure function - no side effects. `present` is whether the task's
    /// id appeared in the snapshot being observed.
    pub fn observe(self, present: bool) -> Self {
        match (self, present) {
            (Self::Pending, true) => Self::Persisted,
            (Self::Pending, false) => Self::Pending,
            (Self::Persisted, true) => Self::Persisted,
            (Self::Persisted, false) => Self::Deleted,
            // An id reappearing after deletion is a distinct record as
            // far as this observer is concerned.
            (Self::Deleted, _) => Self::Deleted,
        }
    }

    /// Whether the task is currently visible in the canonical collection.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }
}

/// Tracks the observed phase of every id seen across snapshots.
#[derive(Debug, Default)]
pub struct PhaseTracker {
    phases: HashMap<TaskId, TaskPhase>,
}

impl PhaseTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one canonical snapshot.
    pub fn on_snapshot(&mut self, snapshot: &[Task]) {
        let present: std::collections::HashSet<&TaskId> =
            snapshot.iter().filter_map(|t| t.id.as_ref()).collect();

        // Advance everything we already track.
        for (id, phase) in self.phases.iter_mut() {
            *phase = phase.observe(present.contains(id));
        }
        // First sighting of an id is the Pending -> Persisted transition.
        for id in present {
            self.phases
                .entry(id.clone())
                .or_insert(TaskPhase::Pending.observe(true));
        }
    }

    /// The observed phase of an id. Ids never seen in any snapshot are
    /// `Pending` from this client's point of view.
    pub fn phase(&self, id: &TaskId) -> TaskPhase {
        self.phases.get(id).copied().unwrap_or_default()
    }
}

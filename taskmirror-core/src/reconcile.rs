//! Snapshot sanitization and reconciliation diffing.
//!
//! The engine replaces its canonical collection wholesale with each
//! incoming snapshot. Before the replacement, [`sanitize`] enforces the
//! canonical invariants: no id-less task ever appears, and ids are
//! unique. [`diff`] summarizes what changed between two snapshots so the
//! engine can log each reconciliation pass.

use std::collections::{HashMap, HashSet};
use taskmirror_types::{Task, TaskId};

/// Enforce the canonical-collection invariants on a raw snapshot.
///
/// - Tasks without an id are dropped; they are transient records the
///   store has not acknowledged and must never reach observers.
/// - Duplicate ids are collapsed to the last occurrence (last write
///   wins), keeping the position of that occurrence's first appearance.
pub fn sanitize(snapshot: Vec<Task>) -> Vec<Task> {
    let mut by_id: HashMap<TaskId, usize> = HashMap::new();
    let mut out: Vec<Task> = Vec::with_capacity(snapshot.len());

    for task in snapshot {
        let Some(id) = task.id.clone() else {
            continue;
        };
        match by_id.get(&id) {
            Some(&slot) => out[slot] = task,
            None => {
                by_id.insert(id, out.len());
                out.push(task);
            }
        }
    }
    out
}

/// Summary of one reconciliation pass, by id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotDiff {
    /// Ids present in the new snapshot but not the old one.
    pub added: Vec<TaskId>,
    /// Ids present in both whose fields changed.
    pub updated: Vec<TaskId>,
    /// Ids present in the old snapshot but not the new one.
    pub removed: Vec<TaskId>,
}

impl SnapshotDiff {
    /// Whether the two snapshots were identical.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Compare two sanitized snapshots.
///
/// Both inputs must already satisfy the canonical invariants (every task
/// has an id, ids unique); [`sanitize`] produces such snapshots.
pub fn diff(old: &[Task], new: &[Task]) -> SnapshotDiff {
    let old_by_id: HashMap<&TaskId, &Task> = old
        .iter()
        .filter_map(|t| t.id.as_ref().map(|id| (id, t)))
        .collect();
    let new_ids: HashSet<&TaskId> = new.iter().filter_map(|t| t.id.as_ref()).collect();

    let mut result = SnapshotDiff::default();
    for task in new {
        let Some(id) = task.id.as_ref() else { continue };
        match old_by_id.get(id) {
            None => result.added.push(id.clone()),
            Some(&previous) if previous != task => result.updated.push(id.clone()),
            Some(_) => {}
        }
    }
    for task in old {
        let Some(id) = task.id.as_ref() else { continue };
        if !new_ids.contains(id) {
            result.removed.push(id.clone());
        }
    }
    result
}

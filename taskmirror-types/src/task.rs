//! The task document.

use crate::TaskId;
use serde::{Deserialize, Serialize};

/// A task document as stored in the remote collection.
///
/// `id` is absent until the store has persisted the record and the client
/// has observed it in a snapshot. The engine never places an id-less task
/// in the canonical collection; such a task is transient, pending store
/// acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier; `None` until persisted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<TaskId>,
    /// Task title. Must be non-empty for the task to be valid.
    pub title: String,
    /// Category label; may be empty. Consumers bucket the empty category
    /// under an "Uncategorized" sentinel, the stored value stays empty.
    #[serde(default)]
    pub category: String,
    /// Free-form note.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

impl Task {
    /// Create a new, not-yet-persisted task.
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        note: Option<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            category: category.into(),
            note,
        }
    }

    /// Create a persisted task with a known id (snapshot material).
    pub fn persisted(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        category: impl Into<String>,
        note: Option<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            title: title.into(),
            category: category.into(),
            note,
        }
    }

    /// Whether the store has acknowledged this task (an id is known).
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Whether the title is valid for display/mutation.
    pub fn has_valid_title(&self) -> bool {
        !self.title.is_empty()
    }
}

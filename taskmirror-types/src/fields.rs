//! Partial-update types for the remote store.
//!
//! A [`TaskPatch`] is what `update_document` carries: the title is always
//! present, the note is a [`NoteChange`] tri-state so that "leave the note
//! untouched", "set the note", and "clear the note" are all expressible.
//! The category is not patchable through the current update surface.

use crate::Task;
use serde::{Deserialize, Serialize};

/// Requested change to a task's note field.
///
/// The tri-state exists because a plain `Option<String>` cannot
/// distinguish "do not touch the note" from "clear the note".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoteChange {
    /// Leave the stored note as it is.
    #[default]
    Unchanged,
    /// Replace the stored note with this value.
    Set(String),
    /// Remove the stored note.
    Clear,
}

impl NoteChange {
    /// Map the legacy `Option<String>` calling convention:
    /// `Some(note)` sets the note, `None` leaves it untouched.
    ///
    /// Clearing a note is not expressible this way; callers that need it
    /// use [`NoteChange::Clear`] directly.
    pub fn from_legacy(note: Option<String>) -> Self {
        match note {
            Some(note) => Self::Set(note),
            None => Self::Unchanged,
        }
    }
}

/// A partial update to a persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title; always carried, per the update contract.
    pub title: String,
    /// Requested note change.
    #[serde(default)]
    pub note: NoteChange,
}

impl TaskPatch {
    /// Create a patch that only renames the task.
    pub fn rename(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            note: NoteChange::Unchanged,
        }
    }

    /// Set the note change carried by this patch.
    pub fn with_note(mut self, note: NoteChange) -> Self {
        self.note = note;
        self
    }

    /// Apply this patch to a stored task in place.
    ///
    /// Field-level last write wins: whatever the patch carries overwrites
    /// the stored value; `NoteChange::Unchanged` carries nothing.
    pub fn apply_to(&self, task: &mut Task) {
        task.title = self.title.clone();
        match &self.note {
            NoteChange::Unchanged => {}
            NoteChange::Set(note) => task.note = Some(note.clone()),
            NoteChange::Clear => task.note = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_task() -> Task {
        Task::persisted("7", "Buy milk", "Home", Some("2%".to_string()))
    }

    #[test]
    fn rename_leaves_note_untouched() {
        let mut task = stored_task();
        TaskPatch::rename("Buy oat milk").apply_to(&mut task);
        assert_eq!(task.title, "Buy oat milk");
        assert_eq!(task.note.as_deref(), Some("2%"));
    }

    #[test]
    fn set_note_overwrites() {
        let mut task = stored_task();
        TaskPatch::rename("Buy oat milk")
            .with_note(NoteChange::Set("urgent".into()))
            .apply_to(&mut task);
        assert_eq!(task.note.as_deref(), Some("urgent"));
    }

    #[test]
    fn clear_note_removes() {
        let mut task = stored_task();
        TaskPatch::rename("Buy milk")
            .with_note(NoteChange::Clear)
            .apply_to(&mut task);
        assert_eq!(task.note, None);
    }

    #[test]
    fn legacy_some_sets_none_leaves() {
        assert_eq!(
            NoteChange::from_legacy(Some("n".into())),
            NoteChange::Set("n".into())
        );
        assert_eq!(NoteChange::from_legacy(None), NoteChange::Unchanged);
    }

    #[test]
    fn category_is_not_patchable() {
        let mut task = stored_task();
        TaskPatch::rename("Renamed").apply_to(&mut task);
        assert_eq!(task.category, "Home");
    }
}

//! # taskmirror-types
//!
//! Document and patch types for the taskmirror sync client.
//!
//! This crate provides the foundational types used across all taskmirror
//! crates:
//! - [`TaskId`], [`Task`] - The task document and its store-assigned identity
//! - [`TaskPatch`], [`NoteChange`] - Partial updates with explicit
//!   omit/set/clear semantics
//! - [`StoreError`] - The remote store error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod fields;
mod ids;
mod task;

pub use error::StoreError;
pub use fields::{NoteChange, TaskPatch};
pub use ids::TaskId;
pub use task::Task;

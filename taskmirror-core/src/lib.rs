//! # taskmirror-core
//!
//! Pure logic for taskmirror (no I/O, instant tests).
//!
//! This crate implements snapshot reconciliation, the observed task
//! lifecycle, and the category grouping projection without any network
//! or runtime dependency, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce
//! output without side effects. The actual I/O (subscriptions, store
//! mutations) is performed by `taskmirror-engine`, which feeds snapshots
//! through these functions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod group;
pub mod lifecycle;
pub mod reconcile;

pub use group::{group_by_category, CategoryGroup, UNCATEGORIZED};
pub use lifecycle::{PhaseTracker, TaskPhase};
pub use reconcile::{diff, sanitize, SnapshotDiff};

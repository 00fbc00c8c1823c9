//! # taskmirror-engine
//!
//! Synchronization engine for taskmirror.
//!
//! This is the library applications use to mirror a remote task
//! collection locally and to issue mutations against it.
//!
//! ## Architecture
//!
//! ```text
//! Application → SyncEngine → TaskStore → remote collection
//!                   ↓
//!            taskmirror-core (pure reconciliation)
//! ```
//!
//! The engine subscribes to a [`TaskStore`] once, replaces its canonical
//! collection wholesale with every snapshot the subscription delivers,
//! and publishes each replacement through a watch channel. Mutations go
//! straight to the store; their effects become visible only through a
//! later snapshot, never through the mutation's own return value.
//!
//! ## Example
//!
//! ```ignore
//! use taskmirror_engine::{EngineConfig, MemoryStore, SyncEngine};
//!
//! let store = MemoryStore::new();
//! let engine = SyncEngine::new(EngineConfig::default(), store);
//!
//! engine.start().await?;
//! engine.add_task("Buy milk", "Home", None).await?;
//!
//! let mut tasks = engine.watch_tasks();
//! tasks.changed().await?; // the add arrives via the next snapshot
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod store;

pub use config::EngineConfig;
pub use engine::{EngineError, SyncEngine};
pub use store::{MemoryStore, SnapshotResult, StoreOp, Subscription, TaskStore};

//! Lifecycle engine for remotely submitted shell jobs.
//!
//! A job is persisted through a [`JobStore`], started by the [`Launcher`], registered for
//! cancellation in the [`Registry`] and followed by a [`Watcher`] until it reaches a terminal
//! status. [`JobCoordinator`] ties these together for callers.

pub mod buffer;
pub mod coordinator;
pub mod error;
pub mod launcher;
pub mod registry;
pub mod status;
pub mod store;
pub mod types;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use buffer::OutputBuffer;
pub use coordinator::{JobCoordinator, JobHandle};
pub use error::JobError;
pub use launcher::{CancelHandle, Launcher};
pub use registry::Registry;
pub use status::{Completion, JobStatus, Outcome};
pub use store::{JobStore, MemoryStore, StoreError, Timed};
pub use watcher::{Watcher, WatcherConfig};

//! In-process bounded job queue.
//!
//! This crate provides:
//! - A cloneable producer handle for enqueueing job ids
//! - A single consumer end for the worker pool
//!
//! Queued entries do not survive a process restart.

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::QueueJob;
pub use queue::{JobQueue, JobReceiver, QueueConfig};

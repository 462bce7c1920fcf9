//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is full ({capacity} jobs waiting)")]
    Full { capacity: usize },

    #[error("Queue is closed")]
    Closed,
}

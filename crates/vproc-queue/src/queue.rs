//! Bounded job queue on a tokio channel.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use vproc_models::JobId;

use crate::error::{QueueError, QueueResult};
use crate::job::QueueJob;

/// Metric names for the queue.
pub mod names {
    pub const JOBS_ENQUEUED: &str = "vproc_queue_jobs_enqueued_total";
    pub const ENQUEUE_REJECTED: &str = "vproc_queue_enqueue_rejected_total";
    pub const QUEUE_DEPTH: &str = "vproc_queue_depth";
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Jobs that may wait for a worker before enqueue is refused
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            capacity: std::env::var("QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|c| *c > 0)
                .unwrap_or(100),
        }
    }
}

/// Producer handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<QueueJob>,
    capacity: usize,
}

/// Consumer end, owned by the worker pool.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::Receiver<QueueJob>,
}

impl JobQueue {
    /// Create a queue and its consumer end.
    pub fn new(config: QueueConfig) -> (Self, JobReceiver) {
        let capacity = config.capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, capacity }, JobReceiver { rx })
    }

    /// Enqueue a job without waiting for room.
    pub fn enqueue(&self, job_id: JobId) -> QueueResult<QueueJob> {
        let job = QueueJob::new(job_id);

        match self.tx.try_send(job.clone()) {
            Ok(()) => {
                metrics::counter!(names::JOBS_ENQUEUED).increment(1);
                metrics::gauge!(names::QUEUE_DEPTH).set(self.depth() as f64);
                debug!(job_id = %job.job_id, depth = self.depth(), "Enqueued job");
                Ok(job)
            }
            Err(TrySendError::Full(_)) => {
                metrics::counter!(names::ENQUEUE_REJECTED, "reason" => "full").increment(1);
                Err(QueueError::Full {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => {
                metrics::counter!(names::ENQUEUE_REJECTED, "reason" => "closed").increment(1);
                Err(QueueError::Closed)
            }
        }
    }

    /// Jobs currently waiting.
    pub fn depth(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the consumer end has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl JobReceiver {
    /// Wait for the next job. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<QueueJob> {
        let job = self.rx.recv().await;
        if job.is_some() {
            metrics::gauge!(names::QUEUE_DEPTH).set(self.rx.len() as f64);
        }
        job
    }

    /// Stop accepting new jobs. Already queued jobs can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

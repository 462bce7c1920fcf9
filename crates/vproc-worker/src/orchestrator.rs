//! Job orchestration.
//!
//! `submit` validates a request, records a `pending` job and queues it.
//! `run` (called by the worker pool) drives the job through the engine.
//! Every write is conditional on the job's current status, so a result that
//! arrives after the job was timed out is dropped instead of overwriting it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use vproc_media::TranscodeEngine;
use vproc_models::{Job, JobId, JobStatus, JobTransition, ProcessVideoRequest};
use vproc_queue::JobQueue;
use vproc_store::{JobStore, StoreError, StoreResult};

use crate::error::{SubmitError, WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::staleness::StalenessMonitor;

const OPERATION: &str = "video_processing";

/// A successfully queued submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub job: Job,
}

/// Result of a status read.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusRead {
    Found(Job),
    /// The job overran its deadline and was failed by this read.
    TimedOut(Job),
    NotFound,
}

pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    engine: Arc<dyn TranscodeEngine>,
    queue: JobQueue,
    monitor: StalenessMonitor,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn JobStore>, engine: Arc<dyn TranscodeEngine>, queue: JobQueue) -> Self {
        Self {
            store,
            engine,
            queue,
            monitor: StalenessMonitor::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: StalenessMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Validate, create a `pending` job and queue it.
    pub async fn submit(&self, request: &ProcessVideoRequest) -> Result<SubmitOutcome, SubmitError> {
        let params = request.validate()?;
        let job = self.store.create(&params).await?;

        match self.queue.enqueue(job.id.clone()) {
            Ok(_) => {
                metrics::record_submitted();
                info!(
                    job_id = %job.id,
                    video = %job.video_path,
                    format = %job.output_format,
                    "Job queued"
                );
                Ok(SubmitOutcome { job })
            }
            Err(source) => {
                metrics::record_rejected("queue");
                warn!(job_id = %job.id, "Could not queue job: {}", source);
                let reject = JobTransition::reject(format!("Could not queue job: {}", source));
                if let Err(e) = self.store.apply(&job.id, &reject).await {
                    warn!(job_id = %job.id, "Failed to mark unqueued job as error: {}", e);
                }
                Err(SubmitError::Queue {
                    job_id: job.id,
                    source,
                })
            }
        }
    }

    /// Process a queued job once. Returns the job's record afterwards.
    ///
    /// Transcode failures end the job in `error` and are not returned as
    /// errors; only store faults are.
    pub async fn run(&self, job_id: &JobId) -> WorkerResult<Job> {
        let logger = JobLogger::new(job_id, OPERATION);

        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or_else(|| WorkerError::JobNotFound(job_id.clone()))?;

        if job.status != JobStatus::Pending {
            logger.log_warning(&format!("already {}, skipping", job.status));
            return Ok(job);
        }

        let job = match self.store.apply(job_id, &JobTransition::start(Utc::now())).await {
            Ok(job) => job,
            Err(e) if e.is_conflict() => {
                logger.log_warning(&format!("lost start race: {}", e));
                return self.current(job_id).await;
            }
            Err(e) => return Err(e.into()),
        };

        metrics::record_started();
        logger.log_start(&format!(
            "{} -> {} (logo: {}, greyscale: {})",
            job.video_path,
            job.output_format,
            overlay_label(&job),
            job.greyscale
        ));

        match self.engine.transcode(job_id, &job.params()).await {
            Ok(output) => self.finish_completed(&logger, output).await,
            Err(err) => {
                metrics::record_failed(err.category.as_str());
                logger.log_error(&format!("{} ({})", err.message, err.category));
                self.finish_failed(&logger, err.message).await
            }
        }
    }

    async fn finish_completed(&self, logger: &JobLogger, output: String) -> WorkerResult<Job> {
        let job_id = logger.job_id();

        match self.store.apply(job_id, &JobTransition::complete(output.clone())).await {
            Ok(job) => {
                metrics::record_completed();
                logger.log_completion(&output);
                Ok(job)
            }
            Err(e) if e.is_conflict() => {
                metrics::record_late_result_discarded();
                logger.log_warning(&format!("result arrived after job ended ({}), discarding output", e));
                self.engine.discard(&output).await;
                self.current(job_id).await
            }
            Err(e) => {
                logger.log_error(&format!("failed to record completion: {}", e));
                self.engine.discard(&output).await;
                let message = format!("Failed to record result: {}", e);
                if let Err(e2) = self.store.apply(job_id, &JobTransition::fail(message)).await {
                    warn!(job_id = %job_id, "Failed to mark job as error: {}", e2);
                }
                Err(e.into())
            }
        }
    }

    async fn finish_failed(&self, logger: &JobLogger, message: String) -> WorkerResult<Job> {
        let job_id = logger.job_id();

        match self.store.apply(job_id, &JobTransition::fail(message)).await {
            Ok(job) => Ok(job),
            Err(e) if e.is_conflict() => {
                logger.log_warning(&format!("failure arrived after job ended: {}", e));
                self.current(job_id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn current(&self, job_id: &JobId) -> WorkerResult<Job> {
        self.store
            .get(job_id)
            .await?
            .ok_or_else(|| WorkerError::JobNotFound(job_id.clone()))
    }

    /// Read a job, failing it first if it has overrun the processing deadline.
    pub async fn status(&self, job_id: &JobId) -> StoreResult<StatusRead> {
        let Some(job) = self.store.get(job_id).await? else {
            return Ok(StatusRead::NotFound);
        };

        let Some(timeout) = self.monitor.check(&job, Utc::now()) else {
            return Ok(StatusRead::Found(job));
        };

        match self.store.apply(job_id, &timeout).await {
            Ok(updated) => {
                metrics::record_timed_out();
                warn!(
                    job_id = %job_id,
                    started_at = ?job.started_at,
                    deadline_secs = self.monitor.deadline().as_secs(),
                    "Job exceeded processing deadline"
                );
                Ok(StatusRead::TimedOut(updated))
            }
            // Someone else finished the job between our read and write.
            Err(e) if e.is_conflict() => Ok(match self.store.get(job_id).await? {
                Some(job) => StatusRead::Found(job),
                None => StatusRead::NotFound,
            }),
            Err(StoreError::NotFound(_)) => Ok(StatusRead::NotFound),
            Err(e) => Err(e),
        }
    }
}

fn overlay_label(job: &Job) -> &'static str {
    if job.logo_path.is_empty() {
        "none"
    } else {
        job.position.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::Notify;
    use vproc_media::{ErrorCategory, TranscodeError};
    use vproc_models::{ProcessingOptions, ValidationError, PROCESSING_TIMEOUT_MESSAGE};
    use vproc_queue::{JobReceiver, QueueConfig};
    use vproc_store::MemoryJobStore;

    use crate::testing::FakeEngine;

    struct Harness {
        store: Arc<MemoryJobStore>,
        engine: Arc<FakeEngine>,
        orchestrator: Arc<Orchestrator>,
        receiver: JobReceiver,
    }

    fn harness(engine: FakeEngine, capacity: usize) -> Harness {
        let store = Arc::new(MemoryJobStore::new());
        let engine = Arc::new(engine);
        let (queue, receiver) = JobQueue::new(QueueConfig { capacity });
        let orchestrator = Arc::new(Orchestrator::new(store.clone(), engine.clone(), queue));
        Harness {
            store,
            engine,
            orchestrator,
            receiver,
        }
    }

    async fn submit(h: &Harness) -> Job {
        h.orchestrator
            .submit(&ProcessVideoRequest::new("https://cdn.example.com/in.mp4"))
            .await
            .unwrap()
            .job
    }

    #[tokio::test]
    async fn test_submit_creates_pending_job_and_queues_it() {
        let mut h = harness(FakeEngine::succeeding(), 8);
        let job = submit(&h).await;

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(h.store.len().await, 1);
        assert_eq!(h.receiver.recv().await.unwrap().job_id, job.id);
    }

    #[tokio::test]
    async fn test_invalid_request_creates_no_job() {
        let h = harness(FakeEngine::succeeding(), 8);

        let err = h
            .orchestrator
            .submit(&ProcessVideoRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Validation(ValidationError::MissingVideo)));

        let bad = ProcessVideoRequest::new("in.mp4").with_options(ProcessingOptions {
            output_format: Some("gif".into()),
            ..Default::default()
        });
        assert!(h.orchestrator.submit(&bad).await.is_err());
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_full_queue_fails_the_new_job() {
        let h = harness(FakeEngine::succeeding(), 1);
        submit(&h).await;

        let err = h
            .orchestrator
            .submit(&ProcessVideoRequest::new("second.mp4"))
            .await
            .unwrap_err();
        let SubmitError::Queue { job_id, .. } = err else {
            panic!("expected queue error");
        };

        let job = h.store.get(&job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.started_at.is_none());
        assert!(job.invariants_hold());
    }

    #[tokio::test]
    async fn test_run_completes_job() {
        let h = harness(FakeEngine::succeeding(), 8);
        let job = submit(&h).await;

        let done = h.orchestrator.run(&job.id).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.output_path, Some(FakeEngine::output_for(&job.id)));
        assert!(done.started_at.is_some());
        assert!(done.invariants_hold());
    }

    #[tokio::test]
    async fn test_run_records_transcode_failure() {
        let h = harness(
            FakeEngine::failing(TranscodeError::new(ErrorCategory::Input, "source unreachable")),
            8,
        );
        let job = submit(&h).await;

        let done = h.orchestrator.run(&job.id).await.unwrap();
        assert_eq!(done.status, JobStatus::Error);
        assert_eq!(done.last_error.as_deref(), Some("source unreachable"));
        assert!(done.output_path.is_none());
        assert!(done.invariants_hold());
    }

    #[tokio::test]
    async fn test_run_twice_skips_second_time() {
        let h = harness(FakeEngine::succeeding(), 8);
        let job = submit(&h).await;

        h.orchestrator.run(&job.id).await.unwrap();
        let again = h.orchestrator.run(&job.id).await.unwrap();

        assert_eq!(again.status, JobStatus::Completed);
        assert_eq!(h.engine.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_with_store_down_returns_fault() {
        let h = harness(FakeEngine::succeeding(), 8);
        let job = submit(&h).await;
        h.store.set_unavailable(true);

        let err = h.orchestrator.run(&job.id).await.unwrap_err();
        assert!(matches!(err, WorkerError::Store(_)));
    }

    #[tokio::test]
    async fn test_status_of_unknown_job() {
        let h = harness(FakeEngine::succeeding(), 8);
        assert_eq!(
            h.orchestrator.status(&JobId::new()).await.unwrap(),
            StatusRead::NotFound
        );
    }

    #[tokio::test]
    async fn test_status_reads_of_terminal_jobs_are_idempotent() {
        let h = harness(FakeEngine::succeeding(), 8);
        let job = submit(&h).await;
        h.orchestrator.run(&job.id).await.unwrap();

        let first = h.orchestrator.status(&job.id).await.unwrap();
        let second = h.orchestrator.status(&job.id).await.unwrap();
        assert_eq!(first, second);
        assert!(matches!(first, StatusRead::Found(ref j) if j.status == JobStatus::Completed));
    }

    #[tokio::test]
    async fn test_stale_job_times_out_once() {
        let h = harness(FakeEngine::succeeding(), 8);
        let job = submit(&h).await;

        let mut stale = job.clone();
        stale
            .apply(
                &JobTransition::start(Utc::now() - chrono::Duration::seconds(301)),
                Utc::now(),
            )
            .unwrap();
        h.store.insert(stale).await;

        let first = h.orchestrator.status(&job.id).await.unwrap();
        let StatusRead::TimedOut(timed_out) = first else {
            panic!("expected timeout, got {:?}", first);
        };
        assert_eq!(timed_out.status, JobStatus::Error);
        assert_eq!(timed_out.last_error.as_deref(), Some(PROCESSING_TIMEOUT_MESSAGE));

        let second = h.orchestrator.status(&job.id).await.unwrap();
        assert_eq!(second, StatusRead::Found(timed_out));
    }

    #[tokio::test]
    async fn test_late_result_is_discarded_after_timeout() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(MemoryJobStore::new());
        let engine = Arc::new(FakeEngine::gated(gate.clone()));
        let (queue, _receiver) = JobQueue::new(QueueConfig::default());
        let orchestrator = Arc::new(
            Orchestrator::new(store.clone(), engine.clone(), queue)
                .with_monitor(StalenessMonitor::new(Duration::ZERO)),
        );

        let job = orchestrator
            .submit(&ProcessVideoRequest::new("in.mp4"))
            .await
            .unwrap()
            .job;

        let runner = {
            let orchestrator = orchestrator.clone();
            let id = job.id.clone();
            tokio::spawn(async move { orchestrator.run(&id).await })
        };

        // Wait until the worker is inside the engine.
        while engine.calls.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;

        let read = orchestrator.status(&job.id).await.unwrap();
        assert!(matches!(read, StatusRead::TimedOut(_)));

        gate.notify_one();
        let after = runner.await.unwrap().unwrap();

        assert_eq!(after.status, JobStatus::Error);
        assert_eq!(after.last_error.as_deref(), Some(PROCESSING_TIMEOUT_MESSAGE));
        assert!(after.output_path.is_none());
        assert_eq!(
            *engine.discarded.lock().unwrap(),
            vec![FakeEngine::output_for(&job.id)]
        );
    }

    /// Start `job` in the background and wait until it is inside the engine.
    async fn run_until_transcoding(h: &Harness, job: &Job) -> tokio::task::JoinHandle<WorkerResult<Job>> {
        let runner = {
            let orchestrator = h.orchestrator.clone();
            let id = job.id.clone();
            tokio::spawn(async move { orchestrator.run(&id).await })
        };
        while h.engine.calls.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        runner
    }

    #[tokio::test]
    async fn test_completion_write_failure_discards_output() {
        let gate = Arc::new(Notify::new());
        let h = harness(FakeEngine::gated(gate.clone()), 8);
        let job = submit(&h).await;

        let runner = run_until_transcoding(&h, &job).await;
        h.store.set_unavailable(true);
        gate.notify_one();

        let err = runner.await.unwrap().unwrap_err();
        assert!(matches!(err, WorkerError::Store(_)));
        assert_eq!(
            *h.engine.discarded.lock().unwrap(),
            vec![FakeEngine::output_for(&job.id)]
        );

        h.store.set_unavailable(false);
        let stored = h.store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
        assert!(stored.output_path.is_none());
        assert!(stored.invariants_hold());
    }

    #[tokio::test]
    async fn test_failure_write_error_leaves_job_processing() {
        let gate = Arc::new(Notify::new());
        let h = harness(
            FakeEngine::gated_failing(gate.clone(), TranscodeError::new(ErrorCategory::Engine, "ffmpeg crashed")),
            8,
        );
        let job = submit(&h).await;

        let runner = run_until_transcoding(&h, &job).await;
        h.store.set_unavailable(true);
        gate.notify_one();

        let err = runner.await.unwrap().unwrap_err();
        assert!(matches!(err, WorkerError::Store(_)));
        assert!(h.engine.discarded.lock().unwrap().is_empty());

        h.store.set_unavailable(false);
        let stored = h.store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
        assert!(stored.last_error.is_none());
    }
}

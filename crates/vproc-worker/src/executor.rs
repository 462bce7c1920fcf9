//! Worker pool consuming the job queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn, Instrument};
use vproc_queue::{JobReceiver, QueueJob};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::orchestrator::Orchestrator;

/// Runs queued jobs with at most `max_concurrent_jobs` in flight.
pub struct JobExecutor {
    config: WorkerConfig,
    orchestrator: Arc<Orchestrator>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, orchestrator: Arc<Orchestrator>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            orchestrator,
            job_semaphore,
            shutdown,
        }
    }

    /// Consume `receiver` until shutdown is signalled or every producer is gone,
    /// then wait (bounded by `shutdown_timeout`) for in-flight jobs.
    pub async fn run(&self, mut receiver: JobReceiver) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.config.max_concurrent_jobs
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            // Take a slot first so a job is only dequeued when it can start.
            let permit = tokio::select! {
                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    info!("Shutdown signal received, stopping executor");
                    break;
                }
                permit = self.job_semaphore.clone().acquire_owned() => {
                    permit.map_err(|_| WorkerError::executor("Semaphore closed"))?
                }
            };

            let job = tokio::select! {
                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    info!("Shutdown signal received, stopping executor");
                    break;
                }
                job = receiver.recv() => match job {
                    Some(job) => job,
                    None => {
                        info!("Job queue closed, stopping executor");
                        break;
                    }
                }
            };

            let orchestrator = Arc::clone(&self.orchestrator);
            let semaphore = Arc::clone(&self.job_semaphore);
            let max_jobs = self.config.max_concurrent_jobs;

            tokio::spawn(async move {
                metrics::set_in_flight(max_jobs - semaphore.available_permits());
                Self::execute_job(orchestrator, job).await;
                drop(permit);
                metrics::set_in_flight(max_jobs - semaphore.available_permits());
            });
        }

        receiver.close();

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "Shutdown timeout ({:?}) reached with jobs still running",
                self.config.shutdown_timeout
            );
        }

        info!("Job executor stopped");
        Ok(())
    }

    async fn execute_job(orchestrator: Arc<Orchestrator>, job: QueueJob) {
        let logger = JobLogger::new(&job.job_id, "video_processing");
        let wait = job.wait_time().num_milliseconds().max(0) as f64 / 1000.0;
        metrics::record_queue_wait(wait);

        async {
            debug!(queue_wait_secs = wait, "Dequeued job");
            match orchestrator.run(&job.job_id).await {
                Ok(record) => debug!(status = %record.status, "Job run finished"),
                Err(e) => error!("Job run aborted: {}", e),
            }
        }
        .instrument(logger.create_span())
        .await
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        while self.job_semaphore.available_permits() < self.config.max_concurrent_jobs {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown. Also stops a `run` that has not started yet.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Notify;
    use vproc_models::{JobStatus, ProcessVideoRequest};
    use vproc_queue::{JobQueue, QueueConfig};
    use vproc_store::{JobStore, MemoryJobStore};

    use crate::testing::FakeEngine;

    #[tokio::test]
    async fn test_stops_on_shutdown_signal() {
        let store = Arc::new(MemoryJobStore::new());
        let (queue, receiver) = JobQueue::new(QueueConfig::default());
        let orchestrator = Arc::new(Orchestrator::new(
            store,
            Arc::new(FakeEngine::succeeding()),
            queue.clone(),
        ));
        let executor = Arc::new(JobExecutor::new(WorkerConfig::default(), orchestrator));

        let handle = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run(receiver).await })
        };

        executor.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(MemoryJobStore::new());
        let engine = Arc::new(FakeEngine::gated(gate.clone()));
        let (queue, receiver) = JobQueue::new(QueueConfig::default());
        let orchestrator = Arc::new(Orchestrator::new(store.clone(), engine.clone(), queue));

        let mut ids = Vec::new();
        for _ in 0..3 {
            let outcome = orchestrator
                .submit(&ProcessVideoRequest::new("in.mp4"))
                .await
                .unwrap();
            ids.push(outcome.job.id);
        }

        let config = WorkerConfig {
            max_concurrent_jobs: 2,
            shutdown_timeout: Duration::from_secs(5),
        };
        let executor = Arc::new(JobExecutor::new(config, orchestrator));
        let handle = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run(receiver).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.calls.lock().unwrap().len(), 2);

        for _ in 0..3 {
            gate.notify_one();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        for _ in 0..100 {
            let mut done = 0;
            for id in &ids {
                if store.get(id).await.unwrap().unwrap().status == JobStatus::Completed {
                    done += 1;
                }
            }
            if done == ids.len() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        for id in &ids {
            assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Completed);
        }

        executor.shutdown();
        handle.await.unwrap().unwrap();
    }
}

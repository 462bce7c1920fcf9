//! In-memory job store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use vproc_models::{Job, JobId, JobParams, JobTransition};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

/// Job store backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    unavailable: AtomicBool,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job record as-is, replacing any existing one.
    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Simulate an outage: every operation fails with `Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store marked unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, params: &JobParams) -> StoreResult<Job> {
        self.check_available()?;
        let job = Job::new(JobId::new(), params.clone(), Utc::now());
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        self.check_available()?;
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn apply(&self, id: &JobId, transition: &JobTransition) -> StoreResult<Job> {
        self.check_available()?;
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        job.apply(transition, Utc::now())?;
        Ok(job.clone())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}

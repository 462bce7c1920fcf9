//! Job store capability.

use async_trait::async_trait;
use vproc_models::{Job, JobId, JobParams, JobTransition};

use crate::error::StoreResult;

/// Durable home of job records.
///
/// Every update is conditional on the job's current status, so two writers
/// racing on the same job cannot both move it out of the same state.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `pending` job and return it with its assigned id.
    async fn create(&self, params: &JobParams) -> StoreResult<Job>;

    /// Fetch a job by id.
    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>>;

    /// Apply `transition` if the job is still in `transition.from()`.
    ///
    /// Returns the updated record, `StoreError::NotFound` if the job does not
    /// exist, or `StoreError::Conflict` if its status has moved on.
    async fn apply(&self, id: &JobId, transition: &JobTransition) -> StoreResult<Job>;

    /// Check the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

//! PostgREST (Supabase) job store.
//!
//! Jobs live in a single table keyed by `id`. Conditional updates are a
//! `PATCH` filtered on both `id` and the expected `status`; an empty
//! representation means the filter matched nothing.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use vproc_models::{Job, JobId, JobParams, JobTransition};

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

/// Metric names for store requests.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "vproc_store_requests_total";
    pub const REQUEST_DURATION: &str = "vproc_store_request_duration_seconds";
}

/// Job store backed by a PostgREST endpoint.
#[derive(Clone)]
pub struct PostgrestJobStore {
    http: Client,
    table_url: String,
    api_key: String,
}

impl PostgrestJobStore {
    /// Create a new client. Fails if `config` does not select PostgREST.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let StoreBackend::Postgrest { url, api_key } = config.backend else {
            return Err(StoreError::config("PostgREST store requires a PostgREST backend"));
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vproc-store/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            table_url: format!("{}/rest/v1/{}", url, config.table),
            api_key,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn id_filter(id: &JobId) -> (&'static str, String) {
        ("id", format!("eq.{}", id))
    }

    /// Send a request and decode the returned rows.
    async fn rows(&self, operation: &'static str, builder: RequestBuilder) -> StoreResult<Vec<Job>> {
        let start = Instant::now();
        let result = async {
            let response = self.authed(builder).send().await?;
            let response = Self::check_status(operation, response).await?;
            Ok::<_, StoreError>(response.json::<Vec<Job>>().await?)
        }
        .await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(names::REQUESTS_TOTAL, "operation" => operation, "outcome" => outcome)
            .increment(1);
        metrics::histogram!(names::REQUEST_DURATION, "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        result
    }

    async fn check_status(operation: &str, response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(operation, status = %status, "PostgREST request failed: {}", body);

        match status {
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Err(StoreError::unavailable(format!("{} returned {}", operation, status)))
            }
            _ => Err(StoreError::request_failed(format!(
                "{} returned {}: {}",
                operation, status, body
            ))),
        }
    }

    fn patch_body(transition: &JobTransition) -> Value {
        let mut body = Map::new();
        body.insert("status".into(), json!(transition.to()));
        body.insert("output_path".into(), json!(transition.output_path()));
        body.insert("last_error".into(), json!(transition.last_error()));
        body.insert("updated_at".into(), json!(Utc::now()));
        if let Some(started_at) = transition.started_at() {
            body.insert("started_at".into(), json!(started_at));
        }
        Value::Object(body)
    }
}

#[async_trait]
impl JobStore for PostgrestJobStore {
    async fn create(&self, params: &JobParams) -> StoreResult<Job> {
        let job = Job::new(JobId::new(), params.clone(), Utc::now());

        let request = self
            .http
            .post(&self.table_url)
            .header("Prefer", "return=representation")
            .json(&job);

        let created = self
            .rows("create", request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::request_failed("insert returned no rows"))?;

        debug!(job_id = %created.id, "Created job record");
        Ok(created)
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let request = self
            .http
            .get(&self.table_url)
            .query(&[Self::id_filter(id), ("select", "*".to_string())]);

        Ok(self.rows("get", request).await?.into_iter().next())
    }

    async fn apply(&self, id: &JobId, transition: &JobTransition) -> StoreResult<Job> {
        let request = self
            .http
            .patch(&self.table_url)
            .query(&[
                Self::id_filter(id),
                ("status", format!("eq.{}", transition.from())),
            ])
            .header("Prefer", "return=representation")
            .json(&Self::patch_body(transition));

        if let Some(updated) = self.rows("apply", request).await?.into_iter().next() {
            return Ok(updated);
        }

        // Nothing matched: either the job is gone or its status moved on.
        match self.get(id).await? {
            Some(current) => Err(StoreError::Conflict {
                job_id: id.clone(),
                expected: transition.from(),
                actual: current.status,
            }),
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        let request = self
            .http
            .get(&self.table_url)
            .query(&[("select", "id"), ("limit", "1")]);

        let response = self.authed(request).send().await.map_err(|e| {
            StoreError::unavailable(format!("PostgREST unreachable: {}", e))
        })?;
        Self::check_status("ping", response).await?;
        Ok(())
    }
}

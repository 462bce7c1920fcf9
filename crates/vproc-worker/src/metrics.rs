//! Job lifecycle metrics.

/// Metric names.
pub mod names {
    pub const JOBS_SUBMITTED: &str = "vproc_jobs_submitted_total";
    pub const JOBS_REJECTED: &str = "vproc_jobs_rejected_total";
    pub const JOBS_STARTED: &str = "vproc_jobs_started_total";
    pub const JOBS_COMPLETED: &str = "vproc_jobs_completed_total";
    pub const JOBS_FAILED: &str = "vproc_jobs_failed_total";
    pub const JOBS_TIMED_OUT: &str = "vproc_jobs_timed_out_total";
    pub const LATE_RESULTS_DISCARDED: &str = "vproc_jobs_late_results_discarded_total";
    pub const JOBS_IN_FLIGHT: &str = "vproc_jobs_in_flight";
    pub const QUEUE_WAIT: &str = "vproc_jobs_queue_wait_seconds";
}

pub fn record_submitted() {
    metrics::counter!(names::JOBS_SUBMITTED).increment(1);
}

pub fn record_rejected(reason: &'static str) {
    metrics::counter!(names::JOBS_REJECTED, "reason" => reason).increment(1);
}

pub fn record_started() {
    metrics::counter!(names::JOBS_STARTED).increment(1);
}

pub fn record_completed() {
    metrics::counter!(names::JOBS_COMPLETED).increment(1);
}

pub fn record_failed(category: &'static str) {
    metrics::counter!(names::JOBS_FAILED, "category" => category).increment(1);
}

pub fn record_timed_out() {
    metrics::counter!(names::JOBS_TIMED_OUT).increment(1);
}

pub fn record_late_result_discarded() {
    metrics::counter!(names::LATE_RESULTS_DISCARDED).increment(1);
}

pub fn set_in_flight(count: usize) {
    metrics::gauge!(names::JOBS_IN_FLIGHT).set(count as f64);
}

pub fn record_queue_wait(seconds: f64) {
    metrics::histogram!(names::QUEUE_WAIT).record(seconds);
}

//! Worker metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a Prometheus recorder.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

use vsum_models::{ErrorKind, StageName};

/// Metric name constants for consistency.
pub mod names {
    /// Stage attempts by stage and result.
    pub const STAGE_ATTEMPTS_TOTAL: &str = "vsum_stage_attempts_total";

    /// Jobs finished by status and error kind.
    pub const JOBS_TOTAL: &str = "vsum_jobs_total";

    /// Wall time of a job from receipt to report, in seconds.
    pub const JOB_DURATION_SECONDS: &str = "vsum_job_duration_seconds";

    /// Callback deliveries by result.
    pub const CALLBACKS_TOTAL: &str = "vsum_callbacks_total";

    /// Callback attempts spent per delivery.
    pub const CALLBACK_ATTEMPTS: &str = "vsum_callback_attempts";

    /// Message loop cycles by outcome.
    pub const CYCLES_TOTAL: &str = "vsum_cycles_total";
}

/// Serve `/metrics` on `port` from a background task.
pub fn install_exporter(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()
}

pub fn record_stage_attempt(stage: StageName, success: bool) {
    counter!(
        names::STAGE_ATTEMPTS_TOTAL,
        "stage" => stage.as_str(),
        "result" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

pub fn record_job(status: &'static str, error_kind: Option<ErrorKind>, duration_secs: f64) {
    counter!(
        names::JOBS_TOTAL,
        "status" => status,
        "error_kind" => error_kind.map(|k| k.as_str()).unwrap_or("none")
    )
    .increment(1);

    histogram!(names::JOB_DURATION_SECONDS, "status" => status).record(duration_secs);
}

pub fn record_callback(delivered: bool, attempts: u32) {
    counter!(
        names::CALLBACKS_TOTAL,
        "result" => if delivered { "delivered" } else { "undelivered" }
    )
    .increment(1);

    histogram!(names::CALLBACK_ATTEMPTS).record(attempts as f64);
}

pub fn record_cycle(outcome: &'static str) {
    counter!(names::CYCLES_TOTAL, "outcome" => outcome).increment(1);
}

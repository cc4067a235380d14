// Prometheus metrics exposed on GET /metrics
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// Finished runs by result: a verdict, "superseded" or "cancelled"
    pub static ref RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "arena_runs_total",
        "Submissions that reached an end state",
        &["result"]
    )
    .expect("arena_runs_total registers once");

    pub static ref RUN_DURATION_SECONDS: Histogram = register_histogram!(
        "arena_run_duration_seconds",
        "Time spent waiting on the execution client",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("arena_run_duration_seconds registers once");

    pub static ref IGNORED_SUBMITS_TOTAL: IntCounter = register_int_counter!(
        "arena_ignored_submits_total",
        "Submits rejected because a run was already in flight"
    )
    .expect("arena_ignored_submits_total registers once");

    pub static ref ACTIVE_SESSIONS: IntGauge = register_int_gauge!(
        "arena_active_sessions",
        "Sessions currently held in memory"
    )
    .expect("arena_active_sessions registers once");
}

/// Render the default registry in the text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

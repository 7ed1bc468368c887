//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Engine lifecycle state
//! - Replica start/stop outcomes
//! - Startup and shutdown durations
//! - Stop deadline violations
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `backup_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration)
//!
//! # Usage
//!
//! ```rust,no_run
//! use backup_engine::metrics;
//! use std::time::Duration;
//!
//! // In the supervisor after a replica start attempt
//! metrics::record_replica_start("local", true);
//!
//! // After teardown completes
//! metrics::record_shutdown_duration(Duration::from_millis(120));
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Gauge for engine state.
pub fn set_engine_state(state: &str) {
    // Encode state as numeric for alerting (0=created .. 5=failed)
    let value = match state {
        "Created" => 0.0,
        "Starting" => 1.0,
        "Running" => 2.0,
        "ShuttingDown" => 3.0,
        "Stopped" => 4.0,
        "Failed" => 5.0,
        _ => -1.0,
    };
    gauge!("backup_engine_state").set(value);
}

/// Gauge for the number of configured replicas.
pub fn set_configured_replicas(count: usize) {
    gauge!("backup_configured_replicas").set(count as f64);
}

/// Record a replica start attempt outcome.
pub fn record_replica_start(replica: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("backup_replica_starts_total", "replica" => replica.to_string(), "status" => status)
        .increment(1);
}

/// Record a replica stop attempt outcome.
///
/// Stop failures are best-effort cleanup problems; they are counted here and
/// logged, never escalated into the overall stop result.
pub fn record_replica_stop(replica: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("backup_replica_stops_total", "replica" => replica.to_string(), "status" => status)
        .increment(1);
}

/// Record time from `start()` to all replicas confirmed running.
pub fn record_startup_duration(duration: Duration) {
    histogram!("backup_startup_duration_seconds").record(duration.as_secs_f64());
}

/// Record time from teardown begin to source closed.
pub fn record_shutdown_duration(duration: Duration) {
    histogram!("backup_shutdown_duration_seconds").record(duration.as_secs_f64());
}

/// Record a stop call that hit its deadline before teardown finished.
pub fn record_stop_timeout() {
    counter!("backup_stop_timeouts_total").increment(1);
}

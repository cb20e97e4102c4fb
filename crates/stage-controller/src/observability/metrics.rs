//! Metrics definitions for the Stage Controller.
//!
//! All metrics follow Prometheus naming conventions:
//! - `stage_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by closed enums:
//! - `decision`: 3 values (applied, skipped, not_initialized)
//! - `slot`: 4 values (local_main, local_sub, remote_main, remote_sub)
//! - `outcome`: 3 values (applied, superseded, failed)
//! - `kind`: 5 values (container kinds)
//! - `reason`: bounded by `SurfaceError::label` / `StageError::label`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return its handle.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Attach latency: media-engine binding, expected well under a frame budget
        .set_buckets_for_metric(
            Matcher::Prefix("stage_attach".to_string()),
            &[
                0.001, 0.005, 0.010, 0.016, 0.033, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set attach latency buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Decision Metrics (Counters)
// ============================================================================

/// Record the outcome of a large-video update decision.
///
/// Metric: `stage_updates_total`
/// Labels: `decision`
pub fn record_update_decision(decision: &str) {
    counter!("stage_updates_total", "decision" => decision.to_string()).increment(1);
}

/// Record a visible-container switch.
///
/// Metric: `stage_container_switches_total`
/// Labels: `kind` (the container made visible)
pub fn record_container_switch(kind: &str) {
    counter!("stage_container_switches_total", "kind" => kind.to_string()).increment(1);
}

/// Record a double tap that requested tile view.
///
/// Metric: `stage_tile_view_requests_total`
pub fn record_tile_view_request() {
    counter!("stage_tile_view_requests_total").increment(1);
}

/// Record a failed stage operation.
///
/// Metric: `stage_errors_total`
/// Labels: `operation`, `reason`
pub fn record_error(operation: &str, reason: &str) {
    counter!(
        "stage_errors_total",
        "operation" => operation.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

// ============================================================================
// Attach Metrics
// ============================================================================

/// Record the outcome of one slot attach.
///
/// Metric: `stage_attach_total`
/// Labels: `slot`, `outcome`
pub fn record_attach(slot: &str, outcome: &str) {
    counter!(
        "stage_attach_total",
        "slot" => slot.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record attach preparation latency.
///
/// Metric: `stage_attach_duration_seconds`
/// Labels: `slot`
pub fn record_attach_duration(slot: &str, duration: Duration) {
    histogram!("stage_attach_duration_seconds", "slot" => slot.to_string())
        .record(duration.as_secs_f64());
}

/// Record an attach failure by reason.
///
/// Metric: `stage_attach_failures_total`
/// Labels: `reason`
pub fn record_attach_failure(reason: &str) {
    counter!("stage_attach_failures_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Actor Metrics (Gauges)
// ============================================================================

/// Set the stage actor mailbox depth.
///
/// Metric: `stage_actor_mailbox_depth`
pub fn set_actor_mailbox_depth(depth: usize) {
    // usize to f64 conversion is safe for realistic mailbox depths
    #[allow(clippy::cast_precision_loss)]
    gauge!("stage_actor_mailbox_depth").set(depth as f64);
}

/// Set the number of registered containers.
///
/// Metric: `stage_containers_registered`
pub fn set_containers_registered(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("stage_containers_registered").set(count as f64);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_update_decision("applied");
        record_attach("local_main", "superseded");
        record_attach_duration("remote_sub", Duration::from_millis(3));
        set_actor_mailbox_depth(0);
    }

    #[test]
    fn test_metric_names_and_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_update_decision("skipped");
            record_update_decision("skipped");
            record_attach("remote_main", "failed");
            record_attach_failure("stream_ended");
            record_container_switch("desktop");
            record_tile_view_request();
            record_error("show_container", "not_initialized");
            record_attach_duration("local_sub", Duration::from_millis(12));
            set_actor_mailbox_depth(4);
            set_containers_registered(2);
        });

        let metrics = snapshotter.snapshot().into_vec();
        let names: Vec<String> = metrics
            .iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();

        for expected in [
            "stage_updates_total",
            "stage_attach_total",
            "stage_attach_failures_total",
            "stage_container_switches_total",
            "stage_tile_view_requests_total",
            "stage_errors_total",
            "stage_attach_duration_seconds",
            "stage_actor_mailbox_depth",
            "stage_containers_registered",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }

        let skipped = metrics
            .iter()
            .find(|(key, _, _, _)| key.key().name() == "stage_updates_total")
            .map(|(_, _, _, value)| value.clone());
        assert_eq!(skipped, Some(DebugValue::Counter(2)).as_ref());
    }
}

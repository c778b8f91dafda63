//! Metrics definitions for the Bingo Controller.
//!
//! All metrics follow Prometheus naming conventions:
//! - `bc_` prefix for Bingo Controller
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `event`: 6 inbound event names
//! - `outcome`: accepted, rejected, duplicate
//! - `reason`: requested, exhausted (resets); malformed, binary (frames)
//! - `actor_type`: session, connection

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Event handling runs in-memory; most buckets are sub-millisecond
        .set_buckets_for_metric(
            Matcher::Prefix("bc_event".to_string()),
            &[
                0.000_1, 0.000_5, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250,
            ],
        )
        .map_err(|e| format!("Failed to set event duration buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Connection & Session Gauges
// ============================================================================

/// Set the number of registered client connections.
///
/// Metric: `bc_connections_active`
pub fn set_connections_active(count: u64) {
    // u64 to f64 conversion is safe for realistic connection counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("bc_connections_active").set(count as f64);
}

/// Set the number of undrawn numbers in the pool.
///
/// Metric: `bc_numbers_remaining`
pub fn set_numbers_remaining(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("bc_numbers_remaining").set(count as f64);
}

// ============================================================================
// Game Counters
// ============================================================================

/// Metric: `bc_draws_total`
pub fn record_draw() {
    counter!("bc_draws_total").increment(1);
}

/// Record a new round.
///
/// Metric: `bc_resets_total`
/// Labels: `reason` (requested, exhausted)
pub fn record_reset(reason: &'static str) {
    counter!("bc_resets_total", "reason" => reason).increment(1);
}

/// Record an adjudicated claim.
///
/// Metric: `bc_claims_total`
/// Labels: `outcome` (accepted, rejected, duplicate)
pub fn record_claim(outcome: &'static str) {
    counter!("bc_claims_total", "outcome" => outcome).increment(1);
}

// ============================================================================
// Delivery & Transport
// ============================================================================

/// Record a delivery that failed and deregistered its connection.
///
/// Metric: `bc_deliveries_failed_total`
pub fn record_delivery_failed() {
    counter!("bc_deliveries_failed_total").increment(1);
}

/// Record a message dropped at a full or closed mailbox.
///
/// Metric: `bc_messages_dropped_total`
/// Labels: `actor_type`
pub fn record_message_dropped(actor_type: &'static str) {
    counter!("bc_messages_dropped_total", "actor_type" => actor_type).increment(1);
}

/// Record an inbound frame that was ignored.
///
/// Metric: `bc_frames_rejected_total`
/// Labels: `reason` (malformed, binary)
pub fn record_frame_rejected(reason: &'static str) {
    counter!("bc_frames_rejected_total", "reason" => reason).increment(1);
}

/// Metric: `bc_actor_panics_total`
/// Labels: `actor_type`
pub fn record_actor_panic(actor_type: &'static str) {
    counter!("bc_actor_panics_total", "actor_type" => actor_type).increment(1);
}

// ============================================================================
// Latency
// ============================================================================

/// Record time spent handling one client event, delivery included.
///
/// Metric: `bc_event_duration_seconds`
/// Labels: `event`
pub fn record_event_duration(event: &'static str, duration: Duration) {
    histogram!("bc_event_duration_seconds", "event" => event).record(duration.as_secs_f64());
}

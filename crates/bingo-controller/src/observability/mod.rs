//! Observability for the Bingo Controller.
//!
//! Actor loops use `#[instrument(skip_all)]` with explicit fields; card
//! contents and player names are never attached to spans.
//!
//! # Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `bc_connections_active` | Gauge | none |
//! | `bc_numbers_remaining` | Gauge | none |
//! | `bc_draws_total` | Counter | none |
//! | `bc_resets_total` | Counter | `reason` |
//! | `bc_claims_total` | Counter | `outcome` |
//! | `bc_deliveries_failed_total` | Counter | none |
//! | `bc_messages_dropped_total` | Counter | `actor_type` |
//! | `bc_frames_rejected_total` | Counter | `reason` |
//! | `bc_actor_panics_total` | Counter | `actor_type` |
//! | `bc_event_duration_seconds` | Histogram | `event` |

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::init_metrics_recorder;

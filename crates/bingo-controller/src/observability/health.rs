//! Health endpoints for the Bingo Controller.
//!
//! - `GET /health` - Liveness (is the process running?)
//! - `GET /ready` - Readiness (is the WebSocket listener bound and the
//!   session actor still running?)
//!
//! The `/metrics` endpoint is merged onto this router in `main`.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Liveness and readiness of the controller.
///
/// Readiness needs both the listener flag and a live session: once the
/// session token is cancelled (shutdown, or the actor loop exiting on its
/// own) the controller reports not ready regardless of the flag.
#[derive(Debug)]
pub struct HealthState {
    live: AtomicBool,
    /// Set once the WebSocket listener is bound; cleared on shutdown.
    listening: AtomicBool,
    session: CancellationToken,
}

impl HealthState {
    /// Track the session behind `session` (a child of the session actor's
    /// token). Starts live and not ready.
    #[must_use]
    pub fn new(session: CancellationToken) -> Self {
        Self {
            live: AtomicBool::new(true),
            listening: AtomicBool::new(false),
            session,
        }
    }

    pub fn set_ready(&self) {
        self.listening.store(true, Ordering::SeqCst);
    }

    pub fn set_not_ready(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn session_running(&self) -> bool {
        !self.session.is_cancelled()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.listening.load(Ordering::SeqCst) && self.session_running()
    }
}

pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

async fn liveness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_live() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::actors::{ActorMetrics, SessionActor};
    use crate::game::{Session, SessionConfig};
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::util::ServiceExt;

    async fn status_of(state: &Arc<HealthState>, uri: &str) -> StatusCode {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        health_router(Arc::clone(state))
            .oneshot(request)
            .await
            .expect("Failed to execute request")
            .status()
    }

    #[test]
    fn test_health_state_transitions() {
        let state = HealthState::new(CancellationToken::new());
        assert!(state.is_live(), "Should be live by default");
        assert!(!state.is_ready(), "Should not be ready by default");

        state.set_ready();
        assert!(state.is_ready());

        state.set_not_ready();
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let state = Arc::new(HealthState::new(CancellationToken::new()));
        assert_eq!(status_of(&state, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_follows_listener_flag() {
        let state = Arc::new(HealthState::new(CancellationToken::new()));
        assert_eq!(status_of(&state, "/ready").await, StatusCode::SERVICE_UNAVAILABLE);

        state.set_ready();
        assert_eq!(status_of(&state, "/ready").await, StatusCode::OK);

        state.set_not_ready();
        assert_eq!(status_of(&state, "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_readiness_drops_when_session_stops() {
        let (handle, task) = SessionActor::spawn(
            Session::with_seed(SessionConfig::default(), 7),
            16,
            CancellationToken::new(),
            ActorMetrics::new(),
        );
        let state = Arc::new(HealthState::new(handle.child_token()));
        state.set_ready();
        assert_eq!(status_of(&state, "/ready").await, StatusCode::OK);

        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("session should stop")
            .expect("session task should not panic");

        assert!(!state.session_running());
        assert_eq!(status_of(&state, "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
        // Liveness is about the process, not the session.
        assert_eq!(status_of(&state, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_drops_when_session_exits_on_its_own() {
        let (handle, task) = SessionActor::spawn(
            Session::with_seed(SessionConfig::default(), 7),
            16,
            CancellationToken::new(),
            ActorMetrics::new(),
        );
        let state = Arc::new(HealthState::new(handle.child_token()));
        state.set_ready();

        // Dropping the last handle closes the mailbox; the actor exits
        // without anyone cancelling it.
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("session should stop")
            .expect("session task should not panic");

        assert_eq!(status_of(&state, "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_path_returns_404() {
        let state = Arc::new(HealthState::new(CancellationToken::new()));
        assert_eq!(status_of(&state, "/unknown").await, StatusCode::NOT_FOUND);
    }
}

//! Session harness for integration tests.
//!
//! Provides `TestSession`, a running `SessionActor` with a deterministic draw
//! sequence, and `TestClient`, a registered connection backed by a
//! [`RecordingSink`].

use crate::sinks::RecordingSink;
use bingo_controller::actors::{
    ActorMetrics, ClientSink, SessionActor, SessionActorHandle, SessionStatus,
};
use bingo_controller::game::{ClaimPolicy, Session, SessionConfig};
use bingo_protocol::ClientEvent;
use common::types::ConnectionId;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 2024;

/// Mailbox size for test sessions.
const TEST_MAILBOX_SIZE: usize = 64;

/// A connected test client.
#[derive(Debug, Clone)]
pub struct TestClient {
    pub id: ConnectionId,
    pub sink: RecordingSink,
}

/// A running session actor.
///
/// # Example
/// ```rust,ignore
/// let session = TestSession::spawn();
/// let player = session.join().await?;
/// session.send(&player, ClientEvent::RequestDraw).await?;
/// let status = session.state().await?;
/// assert_eq!(status.snapshot.history.len(), 1);
/// ```
pub struct TestSession {
    handle: SessionActorHandle,
    metrics: Arc<ActorMetrics>,
    task: Option<JoinHandle<()>>,
}

impl TestSession {
    /// Spawn with default settings and the default seed.
    #[must_use]
    pub fn spawn() -> Self {
        Self::spawn_with(SessionConfig::default(), DEFAULT_SEED)
    }

    /// Spawn with the `Pattern` claim policy.
    #[must_use]
    pub fn spawn_strict() -> Self {
        Self::spawn_with(
            SessionConfig {
                claim_policy: ClaimPolicy::Pattern,
                ..SessionConfig::default()
            },
            DEFAULT_SEED,
        )
    }

    #[must_use]
    pub fn spawn_with(config: SessionConfig, seed: u64) -> Self {
        let metrics = ActorMetrics::new();
        let (handle, task) = SessionActor::spawn(
            Session::with_seed(config, seed),
            TEST_MAILBOX_SIZE,
            CancellationToken::new(),
            Arc::clone(&metrics),
        );
        Self {
            handle,
            metrics,
            task: Some(task),
        }
    }

    #[must_use]
    pub fn handle(&self) -> &SessionActorHandle {
        &self.handle
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<ActorMetrics> {
        &self.metrics
    }

    /// Connect a client backed by a fresh recording sink.
    pub async fn join(&self) -> Result<TestClient, anyhow::Error> {
        self.join_with(RecordingSink::new()).await
    }

    /// Connect a client backed by `sink`.
    pub async fn join_with(&self, sink: RecordingSink) -> Result<TestClient, anyhow::Error> {
        let id = self
            .handle
            .connect(Box::new(sink.clone()))
            .await
            .map_err(|e| anyhow::anyhow!("connect failed: {e}"))?;
        Ok(TestClient { id, sink })
    }

    /// Reconnect `client`'s identifier on a fresh sink.
    pub async fn rejoin(&self, client: &TestClient) -> Result<TestClient, anyhow::Error> {
        let sink = RecordingSink::new();
        let id = self
            .handle
            .connect_as(client.id, Box::new(sink.clone()))
            .await
            .map_err(|e| anyhow::anyhow!("reconnect failed: {e}"))?;
        Ok(TestClient { id, sink })
    }

    /// Connect an arbitrary sink and return its identifier.
    pub async fn join_raw(&self, sink: Box<dyn ClientSink>) -> Result<ConnectionId, anyhow::Error> {
        self.handle
            .connect(sink)
            .await
            .map_err(|e| anyhow::anyhow!("connect failed: {e}"))
    }

    pub async fn send(&self, client: &TestClient, event: ClientEvent) -> Result<(), anyhow::Error> {
        self.send_as(client.id, event).await
    }

    pub async fn send_as(&self, id: ConnectionId, event: ClientEvent) -> Result<(), anyhow::Error> {
        self.handle
            .client_event(id, event)
            .await
            .map_err(|e| anyhow::anyhow!("client event failed: {e}"))
    }

    pub async fn disconnect(&self, client: &TestClient) -> Result<(), anyhow::Error> {
        self.handle
            .disconnect(client.id)
            .await
            .map_err(|e| anyhow::anyhow!("disconnect failed: {e}"))
    }

    /// Current state. Every message sent before this call has been handled.
    pub async fn state(&self) -> Result<SessionStatus, anyhow::Error> {
        self.handle
            .get_state()
            .await
            .map_err(|e| anyhow::anyhow!("get_state failed: {e}"))
    }

    /// Send `count` draw requests from `client`.
    pub async fn draw(&self, client: &TestClient, count: usize) -> Result<(), anyhow::Error> {
        for _ in 0..count {
            self.send(client, ClientEvent::RequestDraw).await?;
        }
        Ok(())
    }

    /// Draw `count` numbers, waiting for each to reach `client`.
    ///
    /// Keeps connection mailboxes from filling during long draw runs. Only
    /// valid while the session is open and the pool holds `count` numbers.
    pub async fn draw_and_wait(
        &self,
        client: &TestClient,
        count: usize,
    ) -> Result<(), anyhow::Error> {
        let seen = client.sink.count("number_drawn");
        for i in 1..=count {
            self.send(client, ClientEvent::RequestDraw).await?;
            client.sink.wait_for_count("number_drawn", seen + i).await;
        }
        Ok(())
    }

    /// Cancel the actor and wait for it to stop.
    pub async fn shutdown(mut self) -> Result<(), anyhow::Error> {
        self.handle.cancel();
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| anyhow::anyhow!("session task failed: {e}"))?;
        }
        Ok(())
    }
}

impl Drop for TestSession {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

//! Client sinks for tests.

use async_trait::async_trait;
use bingo_controller::actors::{ClientSink, SinkError};
use bingo_protocol::{ParticipantView, ServerEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default time `wait_for` polls before failing the test.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct Recorded {
    events: Vec<ServerEvent>,
    closed: bool,
}

/// Records every event written to it.
///
/// Clones share the same record, so keep one clone and hand the other to the
/// session. `fail_after(n)` makes every write after the first `n` fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that accepts `writes` events, then fails.
    #[must_use]
    pub fn fail_after(writes: usize) -> Self {
        Self {
            inner: Arc::default(),
            fail_after: Some(writes),
        }
    }

    #[must_use]
    pub fn events(&self) -> Vec<ServerEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    /// Event names in arrival order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .map(ServerEvent::name)
            .collect()
    }

    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Players in the most recent roster update.
    #[must_use]
    pub fn last_roster(&self) -> Option<Vec<ParticipantView>> {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .rev()
            .find_map(|event| match event {
                ServerEvent::RosterUpdate { players, .. } => Some(players.clone()),
                _ => None,
            })
    }

    /// Most recent event with the given name.
    #[must_use]
    pub fn last(&self, name: &str) -> Option<ServerEvent> {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .rev()
            .find(|event| event.name() == name)
            .cloned()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.inner.lock().unwrap().events.clear();
    }

    /// Wait until an event named `name` has arrived.
    ///
    /// # Panics
    ///
    /// Panics if it does not arrive within [`DEFAULT_WAIT`].
    pub async fn wait_for(&self, name: &str) -> ServerEvent {
        self.wait_until(|sink| sink.last(name)).await.unwrap_or_else(|| {
            panic!(
                "timed out waiting for {name}, received {:?}",
                self.names()
            )
        })
    }

    /// Wait until `count` events named `name` have arrived.
    ///
    /// # Panics
    ///
    /// Panics on timeout.
    pub async fn wait_for_count(&self, name: &str, count: usize) {
        let reached = self
            .wait_until(|sink| (sink.count(name) >= count).then_some(()))
            .await;
        assert!(
            reached.is_some(),
            "timed out waiting for {count} x {name}, received {:?}",
            self.names()
        );
    }

    async fn wait_until<T>(&self, check: impl Fn(&Self) -> Option<T>) -> Option<T> {
        let deadline = tokio::time::Instant::now() + DEFAULT_WAIT;
        loop {
            if let Some(found) = check(self) {
                return Some(found);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn send(&mut self, event: &ServerEvent) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(SinkError::Closed);
        }
        if let Some(limit) = self.fail_after {
            if inner.events.len() >= limit {
                return Err(SinkError::Write("injected failure".to_string()));
            }
        }
        inner.events.push(event.clone());
        Ok(())
    }

    async fn close(&mut self) {
        self.inner.lock().unwrap().closed = true;
    }
}

/// Fails every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;

#[async_trait]
impl ClientSink for FailingSink {
    async fn send(&mut self, _event: &ServerEvent) -> Result<(), SinkError> {
        Err(SinkError::Closed)
    }

    async fn close(&mut self) {}
}

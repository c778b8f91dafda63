//! `SessionActor` - the single task that owns the game.
//!
//! The `SessionActor`:
//! - Owns the [`Session`] and the connection registry
//! - Processes one message at a time, so every operation sees the state left
//!   by the previous one
//! - Supervises one `ConnectionActor` per registered channel
//!
//! # Delivery
//!
//! Outbound events are handed to connection actors with a non-blocking
//! `try_send`; a slow client never stalls the session. A broadcast iterates a
//! snapshot of the registry. Recipients whose delivery fails are collected
//! and deregistered after the pass, and the roster update produced by each
//! deregistration is delivered the same way until a pass completes cleanly.

use crate::errors::BcError;
use crate::game::{Dispatch, Session};
use crate::observability::metrics as prom;

use super::connection::{ClientSink, ConnectionActor, ConnectionActorHandle};
use super::messages::{SessionMessage, SessionStatus};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};

use bingo_protocol::{ClientEvent, ServerEvent};
use common::types::ConnectionId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// How often exited connection actors are reaped while the mailbox is idle.
const REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Time allowed for each connection actor to finish during shutdown.
const CONNECTION_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the `SessionActor`.
#[derive(Clone, Debug)]
pub struct SessionActorHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    mailbox: Arc<MailboxMonitor>,
}

impl SessionActorHandle {
    /// Queue a message, counting it in the mailbox depth before the actor
    /// can see it.
    async fn enqueue(&self, message: SessionMessage) -> Result<(), BcError> {
        let permit = self
            .sender
            .reserve()
            .await
            .map_err(|_| BcError::ShuttingDown)?;
        self.mailbox.record_enqueue();
        permit.send(message);
        Ok(())
    }

    /// Messages waiting in the session mailbox.
    #[must_use]
    pub fn mailbox_depth(&self) -> usize {
        self.mailbox.current_depth()
    }

    /// Deepest the session mailbox has been.
    #[must_use]
    pub fn peak_mailbox_depth(&self) -> usize {
        self.mailbox.peak_depth()
    }

    /// Register a new client channel under a fresh identifier.
    pub async fn connect(&self, sink: Box<dyn ClientSink>) -> Result<ConnectionId, BcError> {
        self.connect_as(ConnectionId::new(), sink).await
    }

    /// Register a client channel under `connection_id`.
    ///
    /// Re-registering a known identifier replaces its sink; the participant
    /// keeps its card, marks and name.
    pub async fn connect_as(
        &self,
        connection_id: ConnectionId,
        sink: Box<dyn ClientSink>,
    ) -> Result<ConnectionId, BcError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.enqueue(SessionMessage::Connect {
            connection_id,
            sink,
            respond_to: tx,
        })
        .await?;

        rx.await
            .map_err(|e| BcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Forward a decoded client event.
    pub async fn client_event(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), BcError> {
        self.enqueue(SessionMessage::ClientEvent {
            connection_id,
            event,
        })
        .await
    }

    /// Notify the session that a client channel closed.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<(), BcError> {
        self.enqueue(SessionMessage::Disconnect { connection_id })
            .await
    }

    /// Get current session state.
    pub async fn get_state(&self) -> Result<SessionStatus, BcError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.enqueue(SessionMessage::GetState { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| BcError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the session actor and, through child tokens, every connection.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Token cancelled together with the session (for servers and tasks).
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

/// Managed connection state.
struct ManagedConnection {
    handle: ConnectionActorHandle,
    task_handle: JoinHandle<()>,
}

/// The `SessionActor` implementation.
pub struct SessionActor {
    session: Session,
    receiver: mpsc::Receiver<SessionMessage>,
    cancel_token: CancellationToken,
    /// Registered channels by identifier.
    connections: HashMap<ConnectionId, ManagedConnection>,
    metrics: Arc<ActorMetrics>,
    mailbox: Arc<MailboxMonitor>,
}

impl SessionActor {
    /// Spawn the session actor around `session`.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        session: Session,
        mailbox_size: usize,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (SessionActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(mailbox_size.max(1));
        let mailbox = Arc::new(MailboxMonitor::new(ActorType::Session, "session"));

        let actor = Self {
            session,
            receiver,
            cancel_token: cancel_token.clone(),
            connections: HashMap::new(),
            metrics,
            mailbox: Arc::clone(&mailbox),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SessionActorHandle {
            sender,
            cancel_token,
            mailbox,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "bc.actor.session")]
    async fn run(mut self) {
        info!(
            target: "bc.actor.session",
            pool_size = self.session.pool().range().len(),
            "SessionActor started"
        );

        // Handles and health checks see the session as cancelled however the
        // loop ends, a panic included.
        let _exit_guard = self.cancel_token.clone().drop_guard();

        let mut reap_ticker = tokio::time::interval(REAP_INTERVAL);
        reap_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            // Check for terminated connection actors
            self.check_connection_health().await;

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "bc.actor.session",
                        "SessionActor received cancellation signal"
                    );
                    self.graceful_shutdown().await;
                    break;
                }

                _ = reap_ticker.tick() => {}

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.handle_message(message);
                            self.mailbox.record_dequeue();
                            self.metrics.record_message_processed();
                        }
                        None => {
                            info!(
                                target: "bc.actor.session",
                                "SessionActor channel closed, exiting"
                            );
                            self.graceful_shutdown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "bc.actor.session",
            participants = self.session.participants().len(),
            messages_processed = self.mailbox.messages_processed(),
            "SessionActor stopped"
        );
    }

    fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Connect {
                connection_id,
                sink,
                respond_to,
            } => {
                self.handle_connect(connection_id, sink);
                let _ = respond_to.send(Ok(connection_id));
            }

            SessionMessage::ClientEvent {
                connection_id,
                event,
            } => {
                if let Err(err) = self.handle_client_event(connection_id, event) {
                    debug!(
                        target: "bc.actor.session",
                        connection_id = %connection_id,
                        error = %err,
                        error_code = err.error_code(),
                        "Client event ignored"
                    );
                }
            }

            SessionMessage::Disconnect { connection_id } => {
                let dispatches = self.release(connection_id);
                self.deliver_all(dispatches);
            }

            SessionMessage::GetState { respond_to } => {
                let _ = respond_to.send(SessionStatus {
                    snapshot: self.session.snapshot(),
                    connections: self.connections.len(),
                });
            }
        }
    }

    fn handle_connect(&mut self, connection_id: ConnectionId, sink: Box<dyn ClientSink>) {
        let (handle, task_handle) = ConnectionActor::spawn(
            connection_id,
            sink,
            self.cancel_token.child_token(),
            Arc::clone(&self.metrics),
        );

        let replaced = self.connections.insert(
            connection_id,
            ManagedConnection {
                handle,
                task_handle,
            },
        );

        match replaced {
            Some(previous) => {
                // Same identifier, new channel. The old writer is retired.
                previous.handle.cancel();
                debug!(
                    target: "bc.actor.session",
                    connection_id = %connection_id,
                    "Connection sink replaced"
                );
            }
            None => {
                self.metrics.connection_created();
                info!(
                    target: "bc.actor.session",
                    connection_id = %connection_id,
                    connections = self.connections.len(),
                    "Connection registered"
                );
            }
        }

        let dispatches = self.session.connect(connection_id);
        self.deliver_all(dispatches);
    }

    fn handle_client_event(
        &mut self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), BcError> {
        if !self.connections.contains_key(&connection_id) {
            return Err(BcError::UnknownParticipant(connection_id.to_string()));
        }

        let started = Instant::now();
        let name = event.name();
        debug!(
            target: "bc.actor.session",
            connection_id = %connection_id,
            event = name,
            "Handling client event"
        );

        let dispatches = match event {
            ClientEvent::HostConnected => self.session.host_connected(connection_id),
            ClientEvent::RequestDraw => self.session.request_draw(),
            ClientEvent::ResetGame => self.session.reset(),
            ClientEvent::SubmitCard(submission) => {
                self.session.submit_card(connection_id, submission)
            }
            ClientEvent::UpdateMarks(update) => self.session.update_marks(&connection_id, update),
            ClientEvent::ClaimWin(claim) => self.session.claim_win(connection_id, claim),
        };

        record_outcome(name, &dispatches);
        prom::set_numbers_remaining(self.session.pool().remaining());

        self.deliver_all(dispatches);
        prom::record_event_duration(name, started.elapsed());
        Ok(())
    }

    /// Deliver dispatches, deregistering every recipient whose delivery fails.
    fn deliver_all(&mut self, dispatches: Vec<Dispatch>) {
        let mut pending = dispatches;

        while !pending.is_empty() {
            let mut failed: Vec<ConnectionId> = Vec::new();
            let mut failed_set: HashSet<ConnectionId> = HashSet::new();

            for dispatch in pending.drain(..) {
                match dispatch {
                    Dispatch::Unicast(to, event) => {
                        let Some(managed) = self.connections.get(&to) else {
                            continue;
                        };
                        if failed_set.contains(&to) {
                            continue;
                        }
                        if let Err(err) = managed.handle.deliver(event) {
                            self.note_failure(to, &err, &mut failed, &mut failed_set);
                        }
                    }
                    Dispatch::Broadcast(event) => {
                        let recipients: Vec<ConnectionActorHandle> = self
                            .connections
                            .values()
                            .map(|managed| managed.handle.clone())
                            .collect();

                        for recipient in recipients {
                            let to = recipient.connection_id();
                            if failed_set.contains(&to) {
                                continue;
                            }
                            if let Err(err) = recipient.deliver(event.clone()) {
                                self.note_failure(to, &err, &mut failed, &mut failed_set);
                            }
                        }
                    }
                }
            }

            for connection_id in failed {
                self.metrics.record_failed_delivery();
                pending.extend(self.release(connection_id));
            }
        }
    }

    fn note_failure(
        &self,
        connection_id: ConnectionId,
        err: &BcError,
        failed: &mut Vec<ConnectionId>,
        failed_set: &mut HashSet<ConnectionId>,
    ) {
        warn!(
            target: "bc.actor.session",
            connection_id = %connection_id,
            error = %err,
            "Delivery failed, connection will be deregistered"
        );
        if failed_set.insert(connection_id) {
            failed.push(connection_id);
        }
    }

    /// Deregister a connection and remove its participant.
    ///
    /// Returns the roster update to deliver. Unknown identifiers are a no-op.
    fn release(&mut self, connection_id: ConnectionId) -> Vec<Dispatch> {
        if let Some(managed) = self.connections.remove(&connection_id) {
            managed.handle.cancel();
            self.metrics.connection_closed();
            info!(
                target: "bc.actor.session",
                connection_id = %connection_id,
                connections = self.connections.len(),
                "Connection deregistered"
            );
        }
        self.session.disconnect(&connection_id)
    }

    /// Reap connection actors that have exited and run their disconnect.
    async fn check_connection_health(&mut self) {
        let finished: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, managed)| managed.task_handle.is_finished())
            .map(|(id, _)| *id)
            .collect();

        for connection_id in finished {
            let Some(managed) = self.connections.remove(&connection_id) else {
                continue;
            };

            match managed.task_handle.await {
                Ok(()) => {
                    debug!(
                        target: "bc.actor.session",
                        connection_id = %connection_id,
                        "Connection actor exited"
                    );
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!(
                            target: "bc.actor.session",
                            connection_id = %connection_id,
                            error = ?join_error,
                            "Connection actor panicked"
                        );
                        self.metrics.record_panic(ActorType::Connection);
                    }
                }
            }

            self.metrics.connection_closed();
            let dispatches = self.session.disconnect(&connection_id);
            self.deliver_all(dispatches);
        }
    }

    async fn graceful_shutdown(&mut self) {
        info!(
            target: "bc.actor.session",
            participants = self.session.participants().len(),
            connections = self.connections.len(),
            "Performing graceful shutdown"
        );

        for managed in self.connections.values() {
            managed.handle.cancel();
        }

        for (connection_id, managed) in self.connections.drain() {
            match tokio::time::timeout(CONNECTION_SHUTDOWN_TIMEOUT, managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "bc.actor.session",
                        connection_id = %connection_id,
                        "Connection completed cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "bc.actor.session",
                        connection_id = %connection_id,
                        error = ?e,
                        "Connection task panicked during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "bc.actor.session",
                        connection_id = %connection_id,
                        "Connection shutdown timed out"
                    );
                }
            }
            self.metrics.connection_closed();
        }

        info!(target: "bc.actor.session", "Graceful shutdown complete");
    }
}

/// Count game outcomes from the events an operation produced.
fn record_outcome(event: &'static str, dispatches: &[Dispatch]) {
    let mut claim_recorded = false;
    for dispatch in dispatches {
        match dispatch.event() {
            ServerEvent::NumberDrawn { .. } => prom::record_draw(),
            ServerEvent::GameReset => {
                prom::record_reset(if event == "request_draw" {
                    "exhausted"
                } else {
                    "requested"
                });
            }
            ServerEvent::WinnerAnnouncement { .. } => {
                prom::record_claim("accepted");
                claim_recorded = true;
            }
            ServerEvent::ClaimRejected { .. } => {
                prom::record_claim("rejected");
                claim_recorded = true;
            }
            _ => {}
        }
    }
    if event == "claim_win" && !claim_recorded {
        prom::record_claim("duplicate");
    }
}

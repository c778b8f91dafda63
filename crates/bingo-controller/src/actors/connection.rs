//! `ConnectionActor` - per-client channel actor.
//!
//! Each `ConnectionActor`:
//! - Owns exactly one [`ClientSink`] (the write half of a client channel)
//! - Writes `ServerEvent`s handed to it by the `SessionActor`, in order
//! - Never touches game state
//!
//! # Lifecycle
//!
//! 1. Spawned by the `SessionActor` when a channel connects
//! 2. Runs until closed, cancelled, or the sink fails
//! 3. An exited actor is reaped by the session, which runs the disconnect
//!    path for its identifier

use crate::errors::BcError;

use super::messages::ConnectionMessage;
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};

use async_trait::async_trait;
use bingo_protocol::ServerEvent;
use common::types::ConnectionId;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the connection mailbox.
pub const CONNECTION_CHANNEL_BUFFER: usize = 200;

/// Errors writing to a client channel.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("client channel closed")]
    Closed,

    #[error("failed to encode event: {0}")]
    Encode(String),

    #[error("write failed: {0}")]
    Write(String),
}

/// Write half of a client channel.
///
/// Implemented by the WebSocket transport and by test sinks.
#[async_trait]
pub trait ClientSink: Send {
    /// Write one event. An error means the channel is unusable.
    async fn send(&mut self, event: &ServerEvent) -> Result<(), SinkError>;

    /// Close the channel. Best effort.
    async fn close(&mut self);
}

/// Handle to a `ConnectionActor`.
#[derive(Clone, Debug)]
pub struct ConnectionActorHandle {
    sender: mpsc::Sender<ConnectionMessage>,
    cancel_token: CancellationToken,
    connection_id: ConnectionId,
    mailbox: Arc<MailboxMonitor>,
}

impl ConnectionActorHandle {
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Queue an event without waiting.
    ///
    /// # Errors
    ///
    /// `BcError::ChannelSend` if the mailbox is full or the actor has exited.
    pub fn deliver(&self, event: ServerEvent) -> Result<(), BcError> {
        match self.sender.try_send(ConnectionMessage::Deliver { event }) {
            Ok(()) => {
                self.mailbox.record_enqueue();
                Ok(())
            }
            Err(err) => {
                self.mailbox.record_drop();
                let reason = match err {
                    TrySendError::Full(_) => "mailbox full",
                    TrySendError::Closed(_) => "mailbox closed",
                };
                Err(BcError::ChannelSend(format!(
                    "{reason} for connection {}",
                    self.connection_id
                )))
            }
        }
    }

    /// Cancel the connection actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `ConnectionActor` implementation.
pub struct ConnectionActor {
    connection_id: ConnectionId,
    sink: Box<dyn ClientSink>,
    receiver: mpsc::Receiver<ConnectionMessage>,
    /// Cancellation token (child of the session's token).
    cancel_token: CancellationToken,
    metrics: Arc<ActorMetrics>,
    mailbox: Arc<MailboxMonitor>,
    is_closing: bool,
    delivered: u64,
}

impl ConnectionActor {
    /// Spawn a new connection actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        connection_id: ConnectionId,
        sink: Box<dyn ClientSink>,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (ConnectionActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(CONNECTION_CHANNEL_BUFFER);
        let mailbox = Arc::new(MailboxMonitor::new(
            ActorType::Connection,
            connection_id.to_string(),
        ));

        let actor = Self {
            connection_id,
            sink,
            receiver,
            cancel_token: cancel_token.clone(),
            metrics,
            mailbox: Arc::clone(&mailbox),
            is_closing: false,
            delivered: 0,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = ConnectionActorHandle {
            sender,
            cancel_token,
            connection_id,
            mailbox,
        };

        (handle, task_handle)
    }

    #[instrument(
        skip_all,
        name = "bc.actor.connection",
        fields(connection_id = %self.connection_id)
    )]
    async fn run(mut self) {
        debug!(
            target: "bc.actor.connection",
            connection_id = %self.connection_id,
            "ConnectionActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "bc.actor.connection",
                        connection_id = %self.connection_id,
                        "ConnectionActor received cancellation signal"
                    );
                    self.graceful_close("cancelled").await;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            let should_exit = self.handle_message(message).await;
                            self.mailbox.record_dequeue();
                            self.metrics.record_message_processed();

                            if should_exit {
                                break;
                            }
                        }
                        None => {
                            debug!(
                                target: "bc.actor.connection",
                                connection_id = %self.connection_id,
                                "ConnectionActor channel closed, exiting"
                            );
                            self.graceful_close("session released connection").await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "bc.actor.connection",
            connection_id = %self.connection_id,
            delivered = self.delivered,
            messages_processed = self.mailbox.messages_processed(),
            "ConnectionActor stopped"
        );
    }

    /// Handle a single message. Returns true if the actor should exit.
    async fn handle_message(&mut self, message: ConnectionMessage) -> bool {
        match message {
            ConnectionMessage::Deliver { event } => self.handle_deliver(&event).await,
        }
    }

    /// Write one event. Returns true if the sink failed.
    async fn handle_deliver(&mut self, event: &ServerEvent) -> bool {
        if self.is_closing {
            return false;
        }

        match self.sink.send(event).await {
            Ok(()) => {
                self.delivered += 1;
                debug!(
                    target: "bc.actor.connection",
                    connection_id = %self.connection_id,
                    event = event.name(),
                    "Event delivered"
                );
                false
            }
            Err(err) => {
                warn!(
                    target: "bc.actor.connection",
                    connection_id = %self.connection_id,
                    event = event.name(),
                    error = %err,
                    "Client write failed, closing connection"
                );
                self.graceful_close("write failed").await;
                true
            }
        }
    }

    async fn graceful_close(&mut self, reason: &str) {
        if self.is_closing {
            return;
        }
        self.is_closing = true;

        debug!(
            target: "bc.actor.connection",
            connection_id = %self.connection_id,
            reason = %reason,
            "Closing connection"
        );

        self.sink.close().await;
    }
}

//! Message types for actor communication.
//!
//! All inter-actor communication uses strongly-typed message passing via `tokio::sync::mpsc`.
//! Response patterns use `tokio::sync::oneshot` for request-reply semantics.

use super::connection::ClientSink;
use crate::errors::BcError;
use crate::game::SessionSnapshot;

use bingo_protocol::{ClientEvent, ServerEvent};
use common::types::ConnectionId;
use std::fmt;
use tokio::sync::oneshot;

/// Messages sent to `SessionActor`.
pub enum SessionMessage {
    /// A client channel opened. Re-registering a known identifier replaces
    /// its sink and keeps its participant state.
    Connect {
        connection_id: ConnectionId,
        sink: Box<dyn ClientSink>,
        /// Response channel for the registered identifier.
        respond_to: oneshot::Sender<Result<ConnectionId, BcError>>,
    },

    /// A decoded frame from a registered client.
    ClientEvent {
        connection_id: ConnectionId,
        event: ClientEvent,
    },

    /// A client channel closed.
    Disconnect { connection_id: ConnectionId },

    /// Get a point-in-time view of the session (for tests and diagnostics).
    GetState {
        respond_to: oneshot::Sender<SessionStatus>,
    },
}

impl fmt::Debug for SessionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMessage::Connect { connection_id, .. } => f
                .debug_struct("Connect")
                .field("connection_id", connection_id)
                .finish_non_exhaustive(),
            SessionMessage::ClientEvent {
                connection_id,
                event,
            } => f
                .debug_struct("ClientEvent")
                .field("connection_id", connection_id)
                .field("event", &event.name())
                .finish(),
            SessionMessage::Disconnect { connection_id } => f
                .debug_struct("Disconnect")
                .field("connection_id", connection_id)
                .finish(),
            SessionMessage::GetState { .. } => f.debug_struct("GetState").finish_non_exhaustive(),
        }
    }
}

/// Messages sent to `ConnectionActor`.
#[derive(Debug)]
pub enum ConnectionMessage {
    /// Write an event to the client.
    Deliver { event: ServerEvent },
}

/// Session state plus registry size.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub snapshot: SessionSnapshot,
    /// Registered connections.
    pub connections: usize,
}

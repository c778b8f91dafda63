//! WebSocket transport.
//!
//! `GET /ws` upgrades to a WebSocket. Each socket is split: the write half
//! becomes the connection's [`ClientSink`], the read half decodes text
//! frames and forwards them to the session. Closing the socket, or any read
//! error, disconnects the participant.

use crate::actors::{ClientSink, SessionActorHandle, SinkError};
use crate::observability::metrics as prom;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use bingo_protocol::{decode_client_event, encode_server_event, ServerEvent};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Router serving the WebSocket endpoint.
pub fn ws_router(session: SessionActorHandle) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(session)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(session): State<SessionActorHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

/// Write half of a WebSocket, sending each event as a JSON text frame.
pub struct WsSink {
    sender: SplitSink<WebSocket, Message>,
}

impl WsSink {
    #[must_use]
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ClientSink for WsSink {
    async fn send(&mut self, event: &ServerEvent) -> Result<(), SinkError> {
        let text = encode_server_event(event).map_err(|e| SinkError::Encode(e.to_string()))?;
        self.sender
            .send(Message::Text(text))
            .await
            .map_err(|e| SinkError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sender.close().await;
    }
}

#[instrument(skip_all, name = "bc.transport.ws", fields(connection_id = tracing::field::Empty))]
async fn handle_socket(socket: WebSocket, session: SessionActorHandle) {
    let (sender, receiver) = socket.split();

    let connection_id = match session.connect(Box::new(WsSink::new(sender))).await {
        Ok(id) => id,
        Err(err) => {
            warn!(target: "bc.transport.ws", error = %err, "Connection refused by session");
            return;
        }
    };
    tracing::Span::current().record("connection_id", tracing::field::display(connection_id));
    info!(target: "bc.transport.ws", connection_id = %connection_id, "WebSocket connected");

    let shutdown = session.child_token();
    read_frames(receiver, &session, connection_id, &shutdown).await;

    if let Err(err) = session.disconnect(connection_id).await {
        debug!(target: "bc.transport.ws", error = %err, "Disconnect not delivered");
    }
    info!(target: "bc.transport.ws", connection_id = %connection_id, "WebSocket closed");
}

async fn read_frames(
    mut receiver: SplitStream<WebSocket>,
    session: &SessionActorHandle,
    connection_id: common::types::ConnectionId,
    shutdown: &CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => break,
            frame = receiver.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => match decode_client_event(&text) {
                Ok(event) => {
                    if session.client_event(connection_id, event).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    prom::record_frame_rejected("malformed");
                    warn!(
                        target: "bc.transport.ws",
                        connection_id = %connection_id,
                        error = %err,
                        frame_len = text.len(),
                        "Malformed frame ignored"
                    );
                }
            },
            Some(Ok(Message::Binary(_))) => {
                prom::record_frame_rejected("binary");
                debug!(
                    target: "bc.transport.ws",
                    connection_id = %connection_id,
                    "Binary frame ignored"
                );
            }
            Some(Ok(Message::Close(_))) | None => break,
            // Ping/pong are answered by the WebSocket layer
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                debug!(
                    target: "bc.transport.ws",
                    connection_id = %connection_id,
                    error = %err,
                    "WebSocket read failed"
                );
                break;
            }
        }
    }
}

//! JSON codec for event frames.

use crate::events::{ClientEvent, ServerEvent};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Error type for codec operations
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Frame is not a JSON object with an `event` member
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// `event` names no known client event
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// `data` does not match the event's payload shape
    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload { event: &'static str, reason: String },

    /// Outbound event could not be serialized
    #[error("Encode failed: {0}")]
    Encode(String),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Decode one inbound text frame.
///
/// A missing or `null` `data` member decodes as the payload's default, and
/// payload-less events ignore `data` entirely.
///
/// # Errors
///
/// Returns an error if the frame is not valid JSON, names an unknown event,
/// or carries a payload of the wrong shape.
pub fn decode_client_event(text: &str) -> Result<ClientEvent, ProtocolError> {
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    let event = match envelope.event.as_str() {
        "host_connected" => ClientEvent::HostConnected,
        "request_draw" => ClientEvent::RequestDraw,
        "reset_game" => ClientEvent::ResetGame,
        "submit_card" => ClientEvent::SubmitCard(payload("submit_card", envelope.data)?),
        "update_marks" => ClientEvent::UpdateMarks(payload("update_marks", envelope.data)?),
        "claim_win" => ClientEvent::ClaimWin(payload("claim_win", envelope.data)?),
        other => return Err(ProtocolError::UnknownEvent(other.to_string())),
    };

    Ok(event)
}

fn payload<T>(event: &'static str, data: Value) -> Result<T, ProtocolError>
where
    T: DeserializeOwned + Default,
{
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
        event,
        reason: e.to_string(),
    })
}

/// Encode one outbound event as a text frame.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_server_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(|e| ProtocolError::Encode(e.to_string()))
}

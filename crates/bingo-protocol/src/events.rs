//! Inbound and outbound event types.
//!
//! Frames are adjacently tagged: `{"event": "<snake_case name>", "data": {...}}`.
//! Events without a payload omit `data`.

use crate::card::{Card, Cell, ClaimedMark};
use common::types::ConnectionId;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The winning pattern a claim asserts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum WinMode {
    /// Any complete row.
    Line,
    /// Any complete column.
    Column,
    /// Top-left to bottom-right diagonal.
    Diagonal,
    /// Top-right to bottom-left diagonal.
    AntiDiagonal,
    /// Every cell on the card.
    FullCard,
    /// Unspecified pattern. Used when a claim names no mode.
    #[default]
    Bingo,
}

impl WinMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            WinMode::Line => "line",
            WinMode::Column => "column",
            WinMode::Diagonal => "diagonal",
            WinMode::AntiDiagonal => "anti_diagonal",
            WinMode::FullCard => "full_card",
            WinMode::Bingo => "bingo",
        }
    }
}

impl fmt::Display for WinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised win mode label.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown win mode: {0}")]
pub struct UnknownWinMode(pub String);

impl FromStr for WinMode {
    type Err = UnknownWinMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "line" | "row" => Ok(WinMode::Line),
            "column" | "col" => Ok(WinMode::Column),
            "diagonal" => Ok(WinMode::Diagonal),
            "anti_diagonal" | "antidiagonal" | "inverse_diagonal" => Ok(WinMode::AntiDiagonal),
            "full_card" | "full_house" | "blackout" => Ok(WinMode::FullCard),
            "bingo" => Ok(WinMode::Bingo),
            _ => Err(UnknownWinMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for WinMode {
    type Error = UnknownWinMode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Visible state of one participant, as carried in roster updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: ConnectionId,
    pub name: String,
    pub card_data: Card,
    pub marked_numbers: Vec<Cell>,
    pub has_won: bool,
    pub win_mode: Option<WinMode>,
    pub is_host: bool,
}

/// Payload of `submit_card`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(default)]
    pub card_data: Card,
}

/// Payload of `update_marks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkUpdate {
    #[serde(default)]
    pub marked_numbers: Vec<Cell>,
}

/// Payload of `claim_win`.
///
/// Decoding is lenient so every claim reaches adjudication: an unrecognised
/// `win_mode` label becomes `Bingo`, and unreadable marks are kept for the
/// validator to reject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinClaim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_win_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub win_mode: Option<WinMode>,
    #[serde(default)]
    pub card_data: Card,
    #[serde(default)]
    pub marked_numbers: Vec<ClaimedMark>,
}

fn lenient_win_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<WinMode>, D::Error> {
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(label.map(|label| label.parse().unwrap_or_default()))
}

/// Events sent by a client.
///
/// Channel open and close are implicit and have no frame. Decode with
/// [`crate::codec::decode_client_event`], which tolerates a missing or empty
/// `data` member on payload-less events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Register this connection as the host.
    HostConnected,
    /// Draw the next number.
    RequestDraw,
    /// Start a new round.
    ResetGame,
    SubmitCard(CardSubmission),
    UpdateMarks(MarkUpdate),
    ClaimWin(WinClaim),
}

impl ClientEvent {
    /// Event name for logs and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ClientEvent::HostConnected => "host_connected",
            ClientEvent::RequestDraw => "request_draw",
            ClientEvent::ResetGame => "reset_game",
            ClientEvent::SubmitCard(_) => "submit_card",
            ClientEvent::UpdateMarks(_) => "update_marks",
            ClientEvent::ClaimWin(_) => "claim_win",
        }
    }
}

/// Events sent by the session to one or all clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full history, sent to a client when it connects.
    ///
    /// `numbers` is sorted for display, `draw_order` keeps draw order.
    DrawHistory {
        numbers: Vec<u8>,
        draw_order: Vec<u8>,
    },
    NumberDrawn {
        number: u8,
    },
    /// Full history after a draw, broadcast.
    DrawHistoryUpdate {
        numbers: Vec<u8>,
        draw_order: Vec<u8>,
    },
    /// Every participant's visible state.
    ///
    /// `player_count` counts participants holding a card.
    RosterUpdate {
        players: Vec<ParticipantView>,
        player_count: usize,
    },
    GameReset,
    WinnerAnnouncement {
        winner_name: String,
        winner_id: ConnectionId,
        win_mode: WinMode,
        card_data: Card,
    },
    /// Private rejection of a claim.
    ClaimRejected {
        message: String,
    },
}

impl ServerEvent {
    /// Event name for logs and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ServerEvent::DrawHistory { .. } => "draw_history",
            ServerEvent::NumberDrawn { .. } => "number_drawn",
            ServerEvent::DrawHistoryUpdate { .. } => "draw_history_update",
            ServerEvent::RosterUpdate { .. } => "roster_update",
            ServerEvent::GameReset => "game_reset",
            ServerEvent::WinnerAnnouncement { .. } => "winner_announcement",
            ServerEvent::ClaimRejected { .. } => "claim_rejected",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_win_mode_labels() {
        assert_eq!("line".parse::<WinMode>().unwrap(), WinMode::Line);
        assert_eq!("Row".parse::<WinMode>().unwrap(), WinMode::Line);
        assert_eq!("anti-diagonal".parse::<WinMode>().unwrap(), WinMode::AntiDiagonal);
        assert_eq!("full card".parse::<WinMode>().unwrap(), WinMode::FullCard);
        assert_eq!("BINGO".parse::<WinMode>().unwrap(), WinMode::Bingo);
        assert!("four corners".parse::<WinMode>().is_err());
    }

    #[test]
    fn test_win_mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(WinMode::AntiDiagonal).unwrap(),
            json!("anti_diagonal")
        );
        let mode: WinMode = serde_json::from_value(json!("full_card")).unwrap();
        assert_eq!(mode, WinMode::FullCard);
    }

    #[test]
    fn test_claim_with_unknown_mode_decodes_as_bingo() {
        let claim: WinClaim =
            serde_json::from_value(json!({"win_mode": "four corners"})).unwrap();
        assert_eq!(claim.win_mode, Some(WinMode::Bingo));

        let claim: WinClaim = serde_json::from_value(json!({"win_mode": "Row"})).unwrap();
        assert_eq!(claim.win_mode, Some(WinMode::Line));

        let claim: WinClaim = serde_json::from_value(json!({"win_mode": null})).unwrap();
        assert_eq!(claim.win_mode, None);
    }

    #[test]
    fn test_server_event_frame_shape() {
        let frame = serde_json::to_value(ServerEvent::NumberDrawn { number: 42 }).unwrap();
        assert_eq!(frame, json!({"event": "number_drawn", "data": {"number": 42}}));

        let reset = serde_json::to_value(ServerEvent::GameReset).unwrap();
        assert_eq!(reset, json!({"event": "game_reset"}));
    }

    #[test]
    fn test_winner_announcement_frame() {
        let id = ConnectionId::new();
        let event = ServerEvent::WinnerAnnouncement {
            winner_name: "Ana".to_string(),
            winner_id: id,
            win_mode: WinMode::Line,
            card_data: Card::new(vec![vec![Cell::Number(1), Cell::FreeSpace]]),
        };
        let frame = serde_json::to_value(&event).unwrap();
        assert_eq!(frame["data"]["winner_id"], json!(id.to_string()));
        assert_eq!(frame["data"]["win_mode"], json!("line"));
        assert_eq!(frame["data"]["card_data"], json!([[1, "X"]]));
    }

    #[test]
    fn test_client_event_names_match_tags() {
        let event = ClientEvent::UpdateMarks(MarkUpdate::default());
        let frame = serde_json::to_value(&event).unwrap();
        assert_eq!(frame["event"], json!(event.name()));
    }
}

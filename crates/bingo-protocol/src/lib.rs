//! Wire protocol for Bingo Hall.
//!
//! Clients and the session controller exchange JSON text frames shaped as
//! `{"event": "<name>", "data": {...}}`. This crate owns the card model
//! shared by both directions, the inbound/outbound event enums and the codec
//! that maps frames to events.

#![warn(clippy::pedantic)]

pub mod card;
pub mod codec;
pub mod events;

pub use card::{Card, Cell, ClaimedMark, FREE_SPACE_MARKER};
pub use codec::{decode_client_event, encode_server_event, ProtocolError};
pub use events::{
    CardSubmission, ClientEvent, MarkUpdate, ParticipantView, ServerEvent, WinClaim, WinMode,
};

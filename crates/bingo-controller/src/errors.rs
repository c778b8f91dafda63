//! Bingo Controller error types.
//!
//! None of these are fatal to the process. Game-level errors are recovered
//! inside the session; only `InvalidClaim` is reported to a client, and only
//! to the claimant. Internal details are logged server-side but not exposed.

use crate::game::ClaimRejection;
use thiserror::Error;

/// Bingo Controller error type.
///
/// Error codes:
/// - `InvalidClaim`: `INVALID_CLAIM` (1)
/// - `UnknownParticipant`: `NOT_FOUND` (4)
/// - `DuplicateClaim`: `CONFLICT` (5)
/// - `ChannelSend`, `Config`, `Transport`, `Internal`: `INTERNAL_ERROR` (6)
/// - `ShuttingDown`: `UNAVAILABLE` (7)
#[derive(Debug, Error)]
pub enum BcError {
    /// Event from a connection that is not registered.
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    /// Claim from a participant who has already won this round.
    #[error("Duplicate claim")]
    DuplicateClaim,

    /// Claim failed validation.
    #[error("Invalid claim: {0}")]
    InvalidClaim(#[from] ClaimRejection),

    /// Delivery to a connection's mailbox failed.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listener or socket error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The session actor is shutting down.
    #[error("Session is shutting down")]
    ShuttingDown,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BcError {
    /// Returns the numeric error code for this error.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        match self {
            BcError::InvalidClaim(_) => 1,       // INVALID_CLAIM
            BcError::UnknownParticipant(_) => 4, // NOT_FOUND
            BcError::DuplicateClaim => 5,        // CONFLICT
            BcError::ChannelSend(_)
            | BcError::Config(_)
            | BcError::Transport(_)
            | BcError::Internal(_) => 6, // INTERNAL_ERROR
            BcError::ShuttingDown => 7,  // UNAVAILABLE
        }
    }

    /// Returns a client-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            BcError::InvalidClaim(reason) => format!(
                "Your claim could not be validated: {reason}. \
                 Check your card against the drawn numbers."
            ),
            BcError::UnknownParticipant(_) => "You are not part of this game".to_string(),
            BcError::DuplicateClaim => "You have already won this round".to_string(),
            BcError::ShuttingDown => "Server is shutting down, please reconnect".to_string(),
            BcError::ChannelSend(_)
            | BcError::Config(_)
            | BcError::Transport(_)
            | BcError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

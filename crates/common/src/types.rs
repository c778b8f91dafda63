//! Common data types for Bingo Hall components.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of leading characters of an identifier used in short display tags.
const SHORT_TAG_LEN: usize = 4;

/// Unique identifier for a client connection.
///
/// Generated when the transport channel opens and stable for the lifetime
/// of that channel. It is the only identity a participant has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short, human-readable tag (first four hex characters).
    #[must_use]
    pub fn short_tag(&self) -> String {
        self.0.simple().to_string().chars().take(SHORT_TAG_LEN).collect()
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

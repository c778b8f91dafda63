//! # BC Test Utilities
//!
//! Shared test utilities for the Bingo Controller (BC) service.
//!
//! ## Modules
//!
//! - `fixtures` - Card builders and event constructors
//! - `sinks` - Client sinks that record, fail, or fail after a number of writes
//! - `harness` - A running `SessionActor` with helpers to join clients
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bc_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let session = TestSession::spawn();
//!     let host = session.join().await?;
//!
//!     session.send(&host, ClientEvent::RequestDraw).await?;
//!     host.sink.wait_for("number_drawn").await;
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod harness;
pub mod sinks;

pub use fixtures::{claim, mark_update, random_card, standard_card, submit, CardFixture};
pub use harness::{TestClient, TestSession};
pub use sinks::{FailingSink, RecordingSink};

// Re-export commonly used types
pub use bingo_protocol::{Card, Cell, ClientEvent, ServerEvent, WinMode};
pub use common::types::ConnectionId;

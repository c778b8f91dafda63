//! Actor model for the Bingo Controller.
//!
//! ```text
//! SessionActor (singleton)
//! ├── owns the Session (pool, participants, claim validator)
//! ├── owns the connection registry
//! └── supervises N ConnectionActors
//!     └── ConnectionActor (one per client channel, owns its ClientSink)
//! ```
//!
//! All mutation happens inside the `SessionActor`. Connection actors only
//! write; the transport reads frames and forwards them through the
//! [`SessionActorHandle`].

pub mod connection;
pub mod messages;
pub mod metrics;
pub mod session;

pub use connection::{
    ClientSink, ConnectionActor, ConnectionActorHandle, SinkError, CONNECTION_CHANNEL_BUFFER,
};
pub use messages::{ConnectionMessage, SessionMessage, SessionStatus};
pub use metrics::{ActorMetrics, ActorType, MailboxLevel, MailboxMonitor};
pub use session::{SessionActor, SessionActorHandle};

//! Game core: draw pool, participant store, claim validation and the
//! session state machine that ties them together.
//!
//! Everything here is synchronous and free of I/O. The actor layer owns a
//! [`Session`] and turns its [`Dispatch`] output into deliveries.

pub mod draw_pool;
pub mod participants;
pub mod session;
pub mod validator;

pub use draw_pool::{DrawPool, PoolError, PoolRange, PoolRangeError, DEFAULT_POOL_MAX, DEFAULT_POOL_MIN};
pub use participants::{placeholder_name, Participant, ParticipantStore, HOST_NAME};
pub use session::{Dispatch, Session, SessionConfig, SessionSnapshot, SessionState};
pub use validator::{readable_marks, validate_claim, ClaimPolicy, ClaimRejection, ClaimValidator};

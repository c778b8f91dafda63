//! Bingo Controller (BC) Service Library
//!
//! This library provides the core functionality for the Bingo Hall session
//! controller - a stateful WebSocket server that coordinates one bingo game:
//!
//! - Drawing numbers from a shared pool without repetition
//! - Tracking each participant's card, marks and win status
//! - Adjudicating win claims against the draw history
//! - Fanning out draws, roster changes and winners to every client
//!
//! # Architecture
//!
//! ```text
//! WebSocket (axum) ──frames──▶ SessionActorHandle
//!                                   │
//!                              SessionActor (single writer)
//!                              ├── Session (pure game core)
//!                              └── N ConnectionActors ──▶ ClientSink
//! ```
//!
//! The game core in [`game`] performs no I/O; each operation returns the
//! messages it produced and the actor delivers them.
//!
//! # Modules
//!
//! - [`actors`] - Session and connection actors
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with client-safe messages
//! - [`game`] - Draw pool, participants, claim validation, session state machine
//! - [`observability`] - Health endpoints and Prometheus metrics
//! - [`transport`] - WebSocket endpoint

#![warn(clippy::pedantic)]

pub mod actors;
pub mod config;
pub mod errors;
pub mod game;
pub mod observability;
pub mod transport;

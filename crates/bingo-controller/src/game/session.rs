//! `Session` - the authoritative game state machine.
//!
//! Owns the draw pool, the participant store and the claim validator. Every
//! operation mutates state and returns the ordered list of messages it
//! produced. The session performs no I/O: delivery is the caller's job, and
//! every message is computed from the state left by the operation that
//! produced it.
//!
//! # States
//!
//! ```text
//! Open --(accepted claim)--> Locked --(reset)--> Open
//! ```
//!
//! Draw requests are ignored while `Locked`. Reset is accepted in both states.

use super::draw_pool::{DrawPool, PoolError, PoolRange};
use super::participants::ParticipantStore;
use super::validator::{readable_marks, ClaimPolicy, ClaimValidator};
use crate::errors::BcError;

use bingo_protocol::{CardSubmission, MarkUpdate, ParticipantView, ServerEvent, WinClaim};
use chrono::{DateTime, Utc};
use common::types::ConnectionId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

/// One outbound message produced by a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Send to a single connection.
    Unicast(ConnectionId, ServerEvent),
    /// Send to every registered connection.
    Broadcast(ServerEvent),
}

impl Dispatch {
    #[must_use]
    pub fn event(&self) -> &ServerEvent {
        match self {
            Dispatch::Unicast(_, event) | Dispatch::Broadcast(event) => event,
        }
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No winner yet; draws allowed.
    Open,
    /// A winner has been declared; draws suspended until reset.
    Locked,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::Locked => "locked",
        }
    }
}

/// Session tunables.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    pub pool_range: PoolRange,
    pub claim_policy: ClaimPolicy,
}

/// Point-in-time view of the whole session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Drawn numbers in draw order.
    pub history: Vec<u8>,
    pub remaining: usize,
    pub participants: Vec<ParticipantView>,
    /// Rounds started since the process began (the first round is 1).
    pub round: u64,
    pub round_started_at: DateTime<Utc>,
}

/// The session aggregate.
pub struct Session {
    pool: DrawPool,
    participants: ParticipantStore,
    validator: ClaimValidator,
    rng: StdRng,
    /// Set by an accepted claim, cleared only by `reset`.
    locked: bool,
    round: u64,
    round_started_at: DateTime<Utc>,
}

impl Session {
    /// Create a session seeded from OS entropy.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a session with a deterministic draw sequence.
    #[must_use]
    pub fn with_seed(config: SessionConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SessionConfig, rng: StdRng) -> Self {
        Self {
            pool: DrawPool::new(config.pool_range),
            participants: ParticipantStore::new(),
            validator: ClaimValidator::new(config.claim_policy),
            rng,
            locked: false,
            round: 1,
            round_started_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.locked {
            SessionState::Locked
        } else {
            SessionState::Open
        }
    }

    #[must_use]
    pub fn pool(&self) -> &DrawPool {
        &self.pool
    }

    #[must_use]
    pub fn participants(&self) -> &ParticipantStore {
        &self.participants
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            history: self.pool.history().to_vec(),
            remaining: self.pool.remaining(),
            participants: self.participants.roster(),
            round: self.round,
            round_started_at: self.round_started_at,
        }
    }

    fn draw_history(&self) -> ServerEvent {
        ServerEvent::DrawHistory {
            numbers: self.pool.sorted_history(),
            draw_order: self.pool.history().to_vec(),
        }
    }

    fn roster_update(&self) -> ServerEvent {
        ServerEvent::RosterUpdate {
            players: self.participants.roster(),
            player_count: self.participants.playing_count(),
        }
    }

    /// Register a connection. Idempotent for known connections.
    ///
    /// The newcomer gets the draw history; everyone gets the roster.
    pub fn connect(&mut self, id: ConnectionId) -> Vec<Dispatch> {
        if self.participants.ensure(id) {
            debug!(target: "bc.game.session", connection_id = %id, "Participant created");
        }
        vec![
            Dispatch::Unicast(id, self.draw_history()),
            Dispatch::Broadcast(self.roster_update()),
        ]
    }

    /// Promote a connection to host. Only the host is sent history and roster.
    pub fn host_connected(&mut self, id: ConnectionId) -> Vec<Dispatch> {
        self.participants.register_host(id);
        info!(target: "bc.game.session", connection_id = %id, "Host registered");
        vec![
            Dispatch::Unicast(id, self.draw_history()),
            Dispatch::Unicast(id, self.roster_update()),
        ]
    }

    /// Remove a participant and broadcast the roster.
    ///
    /// The roster goes out even for unknown identifiers. A winner leaving
    /// does not unlock the session.
    pub fn disconnect(&mut self, id: &ConnectionId) -> Vec<Dispatch> {
        if let Some(participant) = self.participants.remove(id) {
            debug!(
                target: "bc.game.session",
                connection_id = %id,
                was_winner = participant.has_won,
                "Participant removed"
            );
        }
        vec![Dispatch::Broadcast(self.roster_update())]
    }

    /// Draw the next number.
    ///
    /// Ignored while locked. An exhausted pool starts a new round instead of
    /// drawing.
    pub fn request_draw(&mut self) -> Vec<Dispatch> {
        if self.state() == SessionState::Locked {
            debug!(target: "bc.game.session", "Draw ignored, winner already declared");
            return Vec::new();
        }

        match self.pool.draw(&mut self.rng) {
            Ok(number) => {
                debug!(
                    target: "bc.game.session",
                    number,
                    remaining = self.pool.remaining(),
                    "Number drawn"
                );
                vec![
                    Dispatch::Broadcast(ServerEvent::NumberDrawn { number }),
                    Dispatch::Broadcast(ServerEvent::DrawHistoryUpdate {
                        numbers: self.pool.sorted_history(),
                        draw_order: self.pool.history().to_vec(),
                    }),
                    Dispatch::Broadcast(self.roster_update()),
                ]
            }
            Err(PoolError::Exhausted) => {
                info!(target: "bc.game.session", "Pool exhausted, starting a new round");
                self.reset()
            }
        }
    }

    /// Start a new round: refill the pool and clear every card.
    pub fn reset(&mut self) -> Vec<Dispatch> {
        self.pool.reset();
        self.participants.reset_all();
        self.locked = false;
        self.round += 1;
        self.round_started_at = Utc::now();
        info!(target: "bc.game.session", round = self.round, "Game reset");
        vec![
            Dispatch::Broadcast(ServerEvent::GameReset),
            Dispatch::Broadcast(self.roster_update()),
        ]
    }

    /// Store a participant's card. Creates the participant if unknown.
    pub fn submit_card(&mut self, id: ConnectionId, submission: CardSubmission) -> Vec<Dispatch> {
        self.participants
            .submit_card(id, submission.player_name, submission.card_data);
        vec![Dispatch::Broadcast(self.roster_update())]
    }

    /// Sync a participant's marks. Never broadcasts.
    pub fn update_marks(&mut self, id: &ConnectionId, update: MarkUpdate) -> Vec<Dispatch> {
        if !self.participants.update_marks(id, update.marked_numbers) {
            debug!(target: "bc.game.session", connection_id = %id, "Marks from unknown participant ignored");
        }
        Vec::new()
    }

    /// Adjudicate a win claim.
    ///
    /// A repeat claim from a participant who already won is dropped without
    /// any message. Claims are adjudicated in both states.
    pub fn claim_win(&mut self, id: ConnectionId, claim: WinClaim) -> Vec<Dispatch> {
        let mode = claim.win_mode.unwrap_or_default();
        match self.adjudicate(id, claim) {
            Ok(announcement) => {
                info!(
                    target: "bc.game.session",
                    connection_id = %id,
                    win_mode = %mode,
                    drawn = self.pool.history().len(),
                    "Claim accepted"
                );
                vec![
                    Dispatch::Broadcast(announcement),
                    Dispatch::Broadcast(self.roster_update()),
                ]
            }
            Err(BcError::DuplicateClaim) => {
                debug!(target: "bc.game.session", connection_id = %id, "Duplicate claim ignored");
                Vec::new()
            }
            Err(err) => {
                info!(
                    target: "bc.game.session",
                    connection_id = %id,
                    win_mode = %mode,
                    error = %err,
                    "Claim rejected"
                );
                vec![
                    Dispatch::Unicast(
                        id,
                        ServerEvent::ClaimRejected {
                            message: err.client_message(),
                        },
                    ),
                    Dispatch::Broadcast(self.roster_update()),
                ]
            }
        }
    }

    /// Validate a claim and record the win. Returns the announcement.
    ///
    /// The server-held card is authoritative; the claimed card is used only
    /// when none was submitted. An unknown claimant is created from the claim.
    fn adjudicate(&mut self, id: ConnectionId, claim: WinClaim) -> Result<ServerEvent, BcError> {
        let WinClaim {
            player_name,
            win_mode,
            card_data,
            marked_numbers,
        } = claim;

        let card = match self.participants.get(&id) {
            Some(participant) if participant.has_won => return Err(BcError::DuplicateClaim),
            Some(participant) if !participant.card.is_empty() => participant.card.clone(),
            Some(_) => card_data,
            None => {
                self.participants
                    .submit_card(id, player_name.clone(), card_data.clone());
                card_data
            }
        };

        let mode = win_mode.unwrap_or_default();
        let marks = readable_marks(&marked_numbers)?;
        self.validator
            .check(&card, &marks, mode, self.pool.history())?;
        self.participants.record_win(id, mode);
        self.locked = true;

        let winner_name = player_name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.participants.get(&id).map(|p| p.name.clone()))
            .unwrap_or_default();

        Ok(ServerEvent::WinnerAnnouncement {
            winner_name,
            winner_id: id,
            win_mode: mode,
            card_data: card,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::game::participants::{placeholder_name, HOST_NAME};
    use bingo_protocol::{Card, Cell, ClaimedMark, WinMode};

    fn session() -> Session {
        Session::with_seed(SessionConfig::default(), 11)
    }

    fn n(v: u8) -> Cell {
        Cell::Number(v)
    }

    fn names(dispatches: &[Dispatch]) -> Vec<&'static str> {
        dispatches.iter().map(|d| d.event().name()).collect()
    }

    fn claim(marks: Vec<Cell>) -> WinClaim {
        WinClaim {
            player_name: None,
            win_mode: Some(WinMode::Line),
            card_data: Card::default(),
            marked_numbers: marks.into_iter().map(ClaimedMark::from).collect(),
        }
    }

    fn drawn_numbers(session: &mut Session, count: usize) -> Vec<u8> {
        for _ in 0..count {
            session.request_draw();
        }
        session.pool().history().to_vec()
    }

    #[test]
    fn test_connect_sends_history_then_roster() {
        let mut session = session();
        let id = ConnectionId::new();

        let out = session.connect(id);

        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Dispatch::Unicast(to, ServerEvent::DrawHistory { .. }) if *to == id));
        assert!(matches!(&out[1], Dispatch::Broadcast(ServerEvent::RosterUpdate { players, .. }) if players.len() == 1));
    }

    #[test]
    fn test_connect_twice_keeps_card() {
        let mut session = session();
        let id = ConnectionId::new();
        session.connect(id);
        session.submit_card(
            id,
            CardSubmission {
                player_name: Some("Ana".to_string()),
                card_data: Card::new(vec![vec![n(1)]]),
            },
        );

        session.connect(id);

        let participant = session.participants().get(&id).unwrap();
        assert_eq!(participant.name, "Ana");
        assert!(!participant.card.is_empty());
        assert_eq!(session.participants().len(), 1);
    }

    #[test]
    fn test_host_connected_unicasts_only() {
        let mut session = session();
        let host = ConnectionId::new();
        session.connect(host);

        let out = session.host_connected(host);

        assert!(out.iter().all(|d| matches!(d, Dispatch::Unicast(to, _) if *to == host)));
        assert_eq!(names(&out), vec!["draw_history", "roster_update"]);
        assert_eq!(session.participants().get(&host).unwrap().name, HOST_NAME);
    }

    #[test]
    fn test_draw_broadcasts_number_history_roster() {
        let mut session = session();
        let out = session.request_draw();

        assert_eq!(
            names(&out),
            vec!["number_drawn", "draw_history_update", "roster_update"]
        );
        let Dispatch::Broadcast(ServerEvent::NumberDrawn { number }) = out[0] else {
            panic!("expected number_drawn broadcast");
        };
        assert_eq!(session.pool().history(), &[number]);
    }

    #[test]
    fn test_exhausted_pool_resets_without_drawing() {
        let config = SessionConfig {
            pool_range: PoolRange::new(1, 3).unwrap(),
            ..SessionConfig::default()
        };
        let mut session = Session::with_seed(config, 5);
        for _ in 0..3 {
            session.request_draw();
        }
        assert!(session.pool().is_exhausted());

        let out = session.request_draw();

        assert_eq!(names(&out), vec!["game_reset", "roster_update"]);
        assert!(session.pool().history().is_empty());
        assert_eq!(session.pool().remaining(), 3);
        assert_eq!(session.snapshot().round, 2);
    }

    #[test]
    fn test_claim_accepted_locks_session() {
        let mut session = session();
        let id = ConnectionId::new();
        session.connect(id);
        let history = drawn_numbers(&mut session, 3);

        let out = session.claim_win(id, claim(history.iter().map(|v| n(*v)).collect()));

        assert_eq!(names(&out), vec!["winner_announcement", "roster_update"]);
        match &out[0] {
            Dispatch::Broadcast(ServerEvent::WinnerAnnouncement {
                winner_id,
                winner_name,
                win_mode,
                ..
            }) => {
                assert_eq!(*winner_id, id);
                assert_eq!(winner_name, &placeholder_name(&id));
                assert_eq!(*win_mode, WinMode::Line);
            }
            other => panic!("unexpected dispatch {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Locked);
        assert!(session.request_draw().is_empty(), "draws suspended while locked");
        assert_eq!(session.pool().history().len(), 3);
    }

    #[test]
    fn test_claim_with_undrawn_mark_rejected_privately() {
        let mut session = session();
        let id = ConnectionId::new();
        session.connect(id);
        let history = drawn_numbers(&mut session, 2);
        let undrawn = (1..=75).find(|v| !history.contains(v)).unwrap();

        let out = session.claim_win(id, claim(vec![n(history[0]), n(undrawn)]));

        assert!(matches!(
            &out[0],
            Dispatch::Unicast(to, ServerEvent::ClaimRejected { message })
                if *to == id && message.contains(&undrawn.to_string())
        ));
        assert!(matches!(&out[1], Dispatch::Broadcast(ServerEvent::RosterUpdate { .. })));
        assert_eq!(session.state(), SessionState::Open);
        assert!(!session.participants().get(&id).unwrap().has_won);
    }

    #[test]
    fn test_claim_with_unreadable_mark_rejected_privately() {
        let mut session = session();
        let id = ConnectionId::new();
        session.connect(id);
        let history = drawn_numbers(&mut session, 2);

        let mut bad = claim(history.iter().map(|v| n(*v)).collect());
        bad.marked_numbers.push(ClaimedMark::Unreadable("300".to_string()));
        let out = session.claim_win(id, bad);

        assert_eq!(names(&out), vec!["claim_rejected", "roster_update"]);
        assert!(matches!(
            &out[0],
            Dispatch::Unicast(to, ServerEvent::ClaimRejected { message })
                if *to == id && message.contains("300")
        ));
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn test_duplicate_claim_is_silent() {
        let mut session = session();
        let id = ConnectionId::new();
        session.connect(id);
        let history = drawn_numbers(&mut session, 1);
        session.claim_win(id, claim(vec![n(history[0])]));

        let mut second = claim(vec![]);
        second.win_mode = Some(WinMode::FullCard);
        let out = session.claim_win(id, second);

        assert!(out.is_empty());
        assert_eq!(
            session.participants().get(&id).unwrap().win_mode,
            Some(WinMode::Line)
        );
    }

    #[test]
    fn test_second_distinct_winner_while_locked() {
        let mut session = session();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        session.connect(a);
        session.connect(b);
        drawn_numbers(&mut session, 1);

        session.claim_win(a, claim(vec![]));
        let out = session.claim_win(b, claim(vec![]));

        assert_eq!(names(&out), vec!["winner_announcement", "roster_update"]);
        assert!(session.participants().get(&b).unwrap().has_won);
    }

    #[test]
    fn test_claim_from_unknown_creates_participant() {
        let mut session = session();
        let id = ConnectionId::new();
        let mut claim = claim(vec![]);
        claim.player_name = Some("Late".to_string());
        claim.card_data = Card::new(vec![vec![Cell::FreeSpace]]);
        claim.win_mode = None;

        let out = session.claim_win(id, claim);

        let participant = session.participants().get(&id).unwrap();
        assert_eq!(participant.name, "Late");
        assert_eq!(participant.win_mode, Some(WinMode::Bingo));
        assert!(matches!(
            &out[0],
            Dispatch::Broadcast(ServerEvent::WinnerAnnouncement { winner_name, .. }) if winner_name == "Late"
        ));
    }

    #[test]
    fn test_pattern_policy_uses_stored_card() {
        let config = SessionConfig {
            claim_policy: ClaimPolicy::Pattern,
            ..SessionConfig::default()
        };
        let mut session = Session::with_seed(config, 3);
        let id = ConnectionId::new();
        session.connect(id);
        let history = drawn_numbers(&mut session, 2);
        let row: Vec<Cell> = history.iter().map(|v| n(*v)).collect();
        session.submit_card(
            id,
            CardSubmission {
                player_name: None,
                card_data: Card::new(vec![row.clone(), vec![n(74), n(75)]]),
            },
        );

        // Claimed card is ignored when one is stored.
        let mut lying = claim(vec![]);
        lying.card_data = Card::new(vec![vec![Cell::FreeSpace]]);
        let out = session.claim_win(id, lying);
        assert!(matches!(&out[0], Dispatch::Unicast(_, ServerEvent::ClaimRejected { .. })));

        let out = session.claim_win(id, claim(row));
        assert!(matches!(&out[0], Dispatch::Broadcast(ServerEvent::WinnerAnnouncement { .. })));
    }

    #[test]
    fn test_update_marks_never_dispatches() {
        let mut session = session();
        let id = ConnectionId::new();
        session.connect(id);
        let out = session.update_marks(
            &id,
            MarkUpdate {
                marked_numbers: vec![n(3)],
            },
        );
        assert!(out.is_empty());
        assert_eq!(session.participants().get(&id).unwrap().marks, vec![n(3)]);
    }

    #[test]
    fn test_reset_clears_round_state() {
        let mut session = session();
        let host = ConnectionId::new();
        let player = ConnectionId::new();
        session.host_connected(host);
        session.submit_card(
            player,
            CardSubmission {
                player_name: Some("Ana".to_string()),
                card_data: Card::new(vec![vec![n(1), Cell::FreeSpace]]),
            },
        );
        drawn_numbers(&mut session, 5);
        session.claim_win(player, claim(vec![]));

        let out = session.reset();

        assert_eq!(names(&out), vec!["game_reset", "roster_update"]);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Open);
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.remaining, 75);
        for view in &snapshot.participants {
            assert!(!view.has_won);
            assert!(view.card_data.is_empty());
            if view.id == host {
                assert_eq!(view.name, HOST_NAME);
            } else {
                assert_eq!(view.name, placeholder_name(&view.id));
            }
        }
    }

    #[test]
    fn test_disconnect() {
        let mut session = session();
        let id = ConnectionId::new();
        session.connect(id);

        let out = session.disconnect(&id);
        assert!(matches!(&out[..], [Dispatch::Broadcast(ServerEvent::RosterUpdate { players, .. })] if players.is_empty()));

        // Unknown identifiers still refresh everyone's roster.
        let again = session.disconnect(&id);
        assert_eq!(names(&again), vec!["roster_update"]);
        assert!(session.participants().is_empty());
    }

    #[test]
    fn test_winner_resubmitting_card_keeps_session_locked() {
        let mut session = session();
        let id = ConnectionId::new();
        session.connect(id);
        let history = drawn_numbers(&mut session, 2);
        session.claim_win(id, claim(history.iter().map(|v| n(*v)).collect()));
        assert_eq!(session.state(), SessionState::Locked);

        session.submit_card(
            id,
            CardSubmission {
                player_name: Some("Ana".to_string()),
                card_data: Card::new(vec![vec![n(1)]]),
            },
        );

        assert!(!session.participants().get(&id).unwrap().has_won);
        assert_eq!(session.state(), SessionState::Locked);
        assert!(session.request_draw().is_empty());
        assert_eq!(session.pool().history().len(), 2);
    }

    #[test]
    fn test_winner_leaving_keeps_session_locked() {
        let mut session = session();
        let winner = ConnectionId::new();
        let other = ConnectionId::new();
        session.connect(winner);
        session.connect(other);
        drawn_numbers(&mut session, 1);
        session.claim_win(winner, claim(vec![]));

        session.disconnect(&winner);

        assert!(!session.participants().any_winner());
        assert_eq!(session.state(), SessionState::Locked);
        assert!(session.request_draw().is_empty());

        session.reset();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(names(&session.request_draw())[0], "number_drawn");
    }

    #[test]
    fn test_roster_player_count_counts_cards() {
        let mut session = session();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        session.connect(a);
        session.connect(b);

        let out = session.submit_card(
            a,
            CardSubmission {
                player_name: None,
                card_data: Card::new(vec![vec![n(1)]]),
            },
        );

        assert!(matches!(
            &out[0],
            Dispatch::Broadcast(ServerEvent::RosterUpdate { player_count: 1, players }) if players.len() == 2
        ));
    }
}

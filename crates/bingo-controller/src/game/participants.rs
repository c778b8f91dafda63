//! Participant state store.
//!
//! Owns every participant record. The connection registry only routes by
//! [`ConnectionId`]; it never holds a copy of participant state.

use bingo_protocol::{Card, Cell, ParticipantView, WinMode};
use common::types::ConnectionId;
use std::collections::{BTreeSet, HashMap};

/// Display name given to the host.
pub const HOST_NAME: &str = "Host";

/// Placeholder name for a participant that has not named itself.
#[must_use]
pub fn placeholder_name(id: &ConnectionId) -> String {
    format!("Player #{}", id.short_tag())
}

/// Per-participant state.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ConnectionId,
    pub name: String,
    pub card: Card,
    /// Sorted, deduplicated. The free space sorts last.
    pub marks: Vec<Cell>,
    pub has_won: bool,
    pub win_mode: Option<WinMode>,
    pub is_host: bool,
    /// Join order, for a stable roster.
    seq: u64,
}

impl Participant {
    fn new(id: ConnectionId, seq: u64) -> Self {
        Self {
            id,
            name: placeholder_name(&id),
            card: Card::default(),
            marks: Vec::new(),
            has_won: false,
            win_mode: None,
            is_host: false,
            seq,
        }
    }

    /// True when the participant holds a card for the current round.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        !self.card.is_empty()
    }

    #[must_use]
    pub fn to_view(&self) -> ParticipantView {
        ParticipantView {
            id: self.id,
            name: self.name.clone(),
            card_data: self.card.clone(),
            marked_numbers: self.marks.clone(),
            has_won: self.has_won,
            win_mode: self.win_mode,
            is_host: self.is_host,
        }
    }

    fn clear_round(&mut self) {
        self.card = Card::default();
        self.marks.clear();
        self.has_won = false;
        self.win_mode = None;
    }
}

/// Deduplicate and sort marks, adding the free space when the card has one.
fn normalize_marks(card: &Card, marks: impl IntoIterator<Item = Cell>) -> Vec<Cell> {
    let mut set: BTreeSet<Cell> = marks.into_iter().collect();
    if card.has_free_space() {
        set.insert(Cell::FreeSpace);
    }
    set.into_iter().collect()
}

/// Store of all participants in the session.
#[derive(Debug, Default)]
pub struct ParticipantStore {
    participants: HashMap<ConnectionId, Participant>,
    next_seq: u64,
}

impl ParticipantStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, id: ConnectionId) -> &mut Participant {
        let seq = &mut self.next_seq;
        self.participants.entry(id).or_insert_with(|| {
            let participant = Participant::new(id, *seq);
            *seq += 1;
            participant
        })
    }

    /// Create a default participant if absent. Returns true if one was created.
    ///
    /// Existing participants are left untouched.
    pub fn ensure(&mut self, id: ConnectionId) -> bool {
        if self.participants.contains_key(&id) {
            return false;
        }
        self.entry(id);
        true
    }

    /// Mark `id` as the host, creating it if needed.
    pub fn register_host(&mut self, id: ConnectionId) {
        let participant = self.entry(id);
        participant.is_host = true;
        participant.name = HOST_NAME.to_string();
    }

    /// Remove a participant. Unknown identifiers are a no-op.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Participant> {
        self.participants.remove(id)
    }

    /// Replace name and card, reset marks to the free space (if any) and
    /// clear win status. Creates the participant if absent.
    pub fn submit_card(&mut self, id: ConnectionId, name: Option<String>, card: Card) {
        let participant = self.entry(id);
        participant.name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| placeholder_name(&id));
        participant.marks = normalize_marks(&card, std::iter::empty());
        participant.card = card;
        participant.has_won = false;
        participant.win_mode = None;
    }

    /// Replace the marked set. Returns false if `id` is unknown.
    ///
    /// Marks are not checked against the draw history here; that happens
    /// only when a win is claimed.
    pub fn update_marks(&mut self, id: &ConnectionId, marks: Vec<Cell>) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.marks = normalize_marks(&participant.card, marks);
                true
            }
            None => false,
        }
    }

    /// Record an accepted claim.
    pub fn record_win(&mut self, id: ConnectionId, mode: WinMode) {
        let participant = self.entry(id);
        participant.has_won = true;
        participant.win_mode = Some(mode);
    }

    /// Clear card, marks and win status for everyone. Non-host participants
    /// get their placeholder name back.
    pub fn reset_all(&mut self) {
        for participant in self.participants.values_mut() {
            participant.clear_round();
            if !participant.is_host {
                participant.name = placeholder_name(&participant.id);
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: &ConnectionId) -> Option<&Participant> {
        self.participants.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.participants.contains_key(id)
    }

    #[must_use]
    pub fn any_winner(&self) -> bool {
        self.participants.values().any(|p| p.has_won)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participants holding a card.
    #[must_use]
    pub fn playing_count(&self) -> usize {
        self.participants.values().filter(|p| p.is_playing()).count()
    }

    /// All participants in join order.
    #[must_use]
    pub fn roster(&self) -> Vec<ParticipantView> {
        let mut participants: Vec<&Participant> = self.participants.values().collect();
        participants.sort_by_key(|p| p.seq);
        participants.into_iter().map(Participant::to_view).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn n(v: u8) -> Cell {
        Cell::Number(v)
    }

    fn card_with_free_space() -> Card {
        Card::new(vec![vec![n(1), n(2)], vec![Cell::FreeSpace, n(4)]])
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let mut store = ParticipantStore::new();
        let id = ConnectionId::new();

        assert!(store.ensure(id));
        store.submit_card(id, Some("Ana".to_string()), card_with_free_space());
        assert!(!store.ensure(id));

        let participant = store.get(&id).unwrap();
        assert_eq!(participant.name, "Ana");
        assert!(!participant.card.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_placeholder_name_uses_short_tag() {
        let mut store = ParticipantStore::new();
        let id = ConnectionId::new();
        store.ensure(id);

        let name = &store.get(&id).unwrap().name;
        assert_eq!(name, &format!("Player #{}", id.short_tag()));
    }

    #[test]
    fn test_submit_card_seeds_free_space_and_clears_win() {
        let mut store = ParticipantStore::new();
        let id = ConnectionId::new();
        store.ensure(id);
        store.record_win(id, WinMode::Line);

        store.submit_card(id, None, card_with_free_space());

        let participant = store.get(&id).unwrap();
        assert_eq!(participant.marks, vec![Cell::FreeSpace]);
        assert!(!participant.has_won);
        assert_eq!(participant.win_mode, None);
        assert_eq!(participant.name, placeholder_name(&id));
    }

    #[test]
    fn test_submit_card_creates_unknown_participant() {
        let mut store = ParticipantStore::new();
        let id = ConnectionId::new();

        store.submit_card(id, Some("Bo".to_string()), Card::new(vec![vec![n(9)]]));

        let participant = store.get(&id).unwrap();
        assert_eq!(participant.name, "Bo");
        assert!(participant.marks.is_empty());
    }

    #[test]
    fn test_blank_name_falls_back_to_placeholder() {
        let mut store = ParticipantStore::new();
        let id = ConnectionId::new();
        store.submit_card(id, Some("   ".to_string()), Card::default());
        assert_eq!(store.get(&id).unwrap().name, placeholder_name(&id));
    }

    #[test]
    fn test_update_marks_dedups_sorts_and_keeps_free_space() {
        let mut store = ParticipantStore::new();
        let id = ConnectionId::new();
        store.submit_card(id, None, card_with_free_space());

        assert!(store.update_marks(&id, vec![n(4), n(1), n(4), n(99)]));

        assert_eq!(
            store.get(&id).unwrap().marks,
            vec![n(1), n(4), n(99), Cell::FreeSpace]
        );
    }

    #[test]
    fn test_update_marks_ignores_unknown() {
        let mut store = ParticipantStore::new();
        assert!(!store.update_marks(&ConnectionId::new(), vec![n(1)]));
        assert!(store.is_empty());
    }

    #[test]
    fn test_reset_all_regenerates_names_except_host() {
        let mut store = ParticipantStore::new();
        let host = ConnectionId::new();
        let player = ConnectionId::new();
        store.register_host(host);
        store.submit_card(player, Some("Ana".to_string()), card_with_free_space());
        store.record_win(player, WinMode::FullCard);

        store.reset_all();

        let host_state = store.get(&host).unwrap();
        assert_eq!(host_state.name, HOST_NAME);
        assert!(host_state.is_host);

        let player_state = store.get(&player).unwrap();
        assert_eq!(player_state.name, placeholder_name(&player));
        assert!(player_state.card.is_empty());
        assert!(player_state.marks.is_empty());
        assert!(!player_state.has_won);
        assert!(!store.any_winner());
    }

    #[test]
    fn test_register_host_keeps_existing_card() {
        let mut store = ParticipantStore::new();
        let id = ConnectionId::new();
        store.submit_card(id, Some("Ana".to_string()), card_with_free_space());

        store.register_host(id);

        let participant = store.get(&id).unwrap();
        assert_eq!(participant.name, HOST_NAME);
        assert!(participant.is_playing());
    }

    #[test]
    fn test_roster_in_join_order_and_playing_count() {
        let mut store = ParticipantStore::new();
        let ids: Vec<ConnectionId> = (0..4).map(|_| ConnectionId::new()).collect();
        for id in &ids {
            store.ensure(*id);
        }
        store.submit_card(ids[2], None, card_with_free_space());
        store.remove(&ids[1]);

        let roster: Vec<ConnectionId> = store.roster().into_iter().map(|v| v.id).collect();
        assert_eq!(roster, vec![ids[0], ids[2], ids[3]]);
        assert_eq!(store.playing_count(), 1);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut store = ParticipantStore::new();
        assert!(store.remove(&ConnectionId::new()).is_none());
    }
}

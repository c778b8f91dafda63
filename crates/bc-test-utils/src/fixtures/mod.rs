//! Card and event fixtures.
//!
//! The standard card is a 5x5 grid with the usual column ranges
//! (1-15, 16-30, 31-45, 46-60, 61-75) and a free centre.

use bingo_protocol::{
    Card, CardSubmission, Cell, ClaimedMark, ClientEvent, MarkUpdate, WinClaim, WinMode,
};
use rand::seq::index::sample;
use rand::Rng;

/// Column ranges of a 75-ball card.
const COLUMN_RANGES: [(u8, u8); 5] = [(1, 15), (16, 30), (31, 45), (46, 60), (61, 75)];

/// A fixed 5x5 card: rows are
/// `1 16 31 46 61`, `2 17 32 47 62`, `3 18 X 48 63`, `4 19 34 49 64`, `5 20 35 50 65`.
#[must_use]
pub fn standard_card() -> Card {
    let rows = (0..5u8)
        .map(|row| {
            COLUMN_RANGES
                .iter()
                .enumerate()
                .map(|(col, (low, _))| {
                    if row == 2 && col == 2 {
                        Cell::FreeSpace
                    } else {
                        Cell::Number(low + row)
                    }
                })
                .collect()
        })
        .collect();
    Card::new(rows)
}

/// A random 5x5 card with distinct numbers per column and a free centre.
pub fn random_card<R: Rng + ?Sized>(rng: &mut R) -> Card {
    let columns: Vec<Vec<u8>> = COLUMN_RANGES
        .iter()
        .map(|(low, high)| {
            let span = usize::from(high - low) + 1;
            sample(rng, span, 5)
                .into_iter()
                .map(|offset| low + u8::try_from(offset).expect("offset fits in u8"))
                .collect()
        })
        .collect();

    let rows = (0..5)
        .map(|row| {
            (0..5)
                .map(|col| {
                    if row == 2 && col == 2 {
                        Cell::FreeSpace
                    } else {
                        Cell::Number(columns[col][row])
                    }
                })
                .collect()
        })
        .collect();
    Card::new(rows)
}

/// Helpers over a card's cells.
pub trait CardFixture {
    /// Numbers of row `index`, free space excluded.
    fn row_numbers(&self, index: usize) -> Vec<u8>;

    /// Every number on the card.
    fn numbers(&self) -> Vec<u8>;
}

impl CardFixture for Card {
    fn row_numbers(&self, index: usize) -> Vec<u8> {
        self.rows()
            .get(index)
            .map(|row| row.iter().filter_map(|cell| cell.number()).collect())
            .unwrap_or_default()
    }

    fn numbers(&self) -> Vec<u8> {
        self.cells().filter_map(|cell| cell.number()).collect()
    }
}

/// `submit_card` event.
#[must_use]
pub fn submit(name: &str, card: Card) -> ClientEvent {
    ClientEvent::SubmitCard(CardSubmission {
        player_name: Some(name.to_string()),
        card_data: card,
    })
}

/// `update_marks` event.
#[must_use]
pub fn mark_update(numbers: &[u8]) -> ClientEvent {
    ClientEvent::UpdateMarks(MarkUpdate {
        marked_numbers: numbers.iter().copied().map(Cell::Number).collect(),
    })
}

/// `claim_win` event marking `numbers` on `card`.
#[must_use]
pub fn claim(name: &str, mode: WinMode, card: Card, numbers: &[u8]) -> ClientEvent {
    ClientEvent::ClaimWin(WinClaim {
        player_name: Some(name.to_string()),
        win_mode: Some(mode),
        card_data: card,
        marked_numbers: numbers
            .iter()
            .map(|n| ClaimedMark::Cell(Cell::Number(*n)))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_standard_card_layout() {
        let card = standard_card();
        assert_eq!(card.height(), 5);
        assert_eq!(card.width(), 5);
        assert!(card.has_free_space());
        assert_eq!(card.row_numbers(0), vec![1, 16, 31, 46, 61]);
        assert_eq!(card.row_numbers(2), vec![3, 18, 48, 63]);
        assert_eq!(card.numbers().len(), 24);
    }

    #[test]
    fn test_random_card_respects_columns() {
        let mut rng = StdRng::seed_from_u64(8);
        let card = random_card(&mut rng);

        let numbers: HashSet<u8> = card.numbers().into_iter().collect();
        assert_eq!(numbers.len(), 24);

        for (col, (low, high)) in COLUMN_RANGES.iter().enumerate() {
            for cell in card.column(col) {
                if let Cell::Number(n) = cell {
                    assert!((*low..=*high).contains(&n));
                }
            }
        }
    }
}

//! Win claim validation.
//!
//! The baseline check only proves that every claimed mark was drawn. The
//! `Pattern` policy additionally requires the claimed pattern to be complete
//! on the card held by the server.

use bingo_protocol::{Card, Cell, ClaimedMark, WinMode};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Baseline claim check: every non-free-space mark must be in `history`.
///
/// The card is not consulted. Spatial arrangement of the marks is ignored.
#[must_use]
pub fn validate_claim(_card: &Card, marks: &[Cell], history: &[u8]) -> bool {
    marks
        .iter()
        .filter_map(|cell| cell.number())
        .all(|n| history.contains(&n))
}

/// How strictly claims are adjudicated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClaimPolicy {
    /// Accept once every claimed mark is drawn.
    #[default]
    MarksDrawn,
    /// Also require the claimed pattern to be complete on the card.
    Pattern,
}

impl ClaimPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ClaimPolicy::MarksDrawn => "marks",
            ClaimPolicy::Pattern => "pattern",
        }
    }
}

impl fmt::Display for ClaimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "marks" | "marks_drawn" => Ok(ClaimPolicy::MarksDrawn),
            "pattern" => Ok(ClaimPolicy::Pattern),
            other => Err(format!(
                "unknown claim policy {other:?} (expected \"marks\" or \"pattern\")"
            )),
        }
    }
}

/// Why a claim was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimRejection {
    #[error("number {0} has not been drawn")]
    UndrawnMark(u8),

    #[error("the {0} pattern is not complete on your card")]
    PatternIncomplete(WinMode),

    #[error("{0:?} is not a number that can be drawn")]
    UnreadableMark(String),
}

/// Claimed marks as cells. The first unreadable mark rejects the claim.
///
/// # Errors
///
/// Returns `ClaimRejection::UnreadableMark` naming the offending value.
pub fn readable_marks(marks: &[ClaimedMark]) -> Result<Vec<Cell>, ClaimRejection> {
    marks
        .iter()
        .map(|mark| match mark {
            ClaimedMark::Cell(cell) => Ok(*cell),
            ClaimedMark::Unreadable(raw) => Err(ClaimRejection::UnreadableMark(raw.clone())),
        })
        .collect()
}

/// Applies a [`ClaimPolicy`] to claims.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimValidator {
    policy: ClaimPolicy,
}

impl ClaimValidator {
    #[must_use]
    pub const fn new(policy: ClaimPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> ClaimPolicy {
        self.policy
    }

    /// Adjudicate a claim.
    ///
    /// # Errors
    ///
    /// Returns the first reason the claim fails under the configured policy.
    pub fn check(
        &self,
        card: &Card,
        marks: &[Cell],
        mode: WinMode,
        history: &[u8],
    ) -> Result<(), ClaimRejection> {
        if !validate_claim(card, marks, history) {
            let undrawn = marks
                .iter()
                .filter_map(|cell| cell.number())
                .find(|n| !history.contains(n))
                .unwrap_or_default();
            return Err(ClaimRejection::UndrawnMark(undrawn));
        }

        match self.policy {
            ClaimPolicy::MarksDrawn => Ok(()),
            ClaimPolicy::Pattern => {
                if pattern_complete(card, mode, |cell| covered(cell, marks, history)) {
                    Ok(())
                } else {
                    Err(ClaimRejection::PatternIncomplete(mode))
                }
            }
        }
    }
}

/// A cell counts toward a pattern if it is the free space, or it is both
/// marked and drawn.
fn covered(cell: Cell, marks: &[Cell], history: &[u8]) -> bool {
    match cell {
        Cell::FreeSpace => true,
        Cell::Number(n) => marks.contains(&cell) && history.contains(&n),
    }
}

fn line_complete(cells: &[Cell], is_covered: &impl Fn(Cell) -> bool) -> bool {
    !cells.is_empty() && cells.iter().all(|c| is_covered(*c))
}

/// True if `mode` is complete on `card`. `Bingo` accepts any pattern.
#[must_use]
pub fn pattern_complete(card: &Card, mode: WinMode, is_covered: impl Fn(Cell) -> bool) -> bool {
    if card.is_empty() {
        return false;
    }
    let any_row = || card.rows().iter().any(|row| line_complete(row, &is_covered));
    let any_column = || (0..card.width()).any(|i| line_complete(&card.column(i), &is_covered));
    let diagonal = || line_complete(&card.diagonal(), &is_covered);
    let anti_diagonal = || line_complete(&card.anti_diagonal(), &is_covered);
    let full = || card.cells().all(&is_covered);

    match mode {
        WinMode::Line => any_row(),
        WinMode::Column => any_column(),
        WinMode::Diagonal => diagonal(),
        WinMode::AntiDiagonal => anti_diagonal(),
        WinMode::FullCard => full(),
        WinMode::Bingo => any_row() || any_column() || diagonal() || anti_diagonal() || full(),
    }
}

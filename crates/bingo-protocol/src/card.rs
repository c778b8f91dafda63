//! Card model: a grid of cells, each a number or the free space.

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Wire marker for the free-space cell.
pub const FREE_SPACE_MARKER: &str = "X";

/// One cell of a card, or one marked value.
///
/// Ordering puts every number before the free space, so a sorted mark list
/// reads `[3, 17, 42, "X"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cell {
    /// A drawable number.
    Number(u8),
    /// The free-space marker. Always counts as marked.
    FreeSpace,
}

impl Cell {
    /// The number in this cell, if any.
    #[must_use]
    pub const fn number(self) -> Option<u8> {
        match self {
            Cell::Number(n) => Some(n),
            Cell::FreeSpace => None,
        }
    }

    #[must_use]
    pub const fn is_free_space(self) -> bool {
        matches!(self, Cell::FreeSpace)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{n}"),
            Cell::FreeSpace => f.write_str(FREE_SPACE_MARKER),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Number(n) => serializer.serialize_u8(*n),
            Cell::FreeSpace => serializer.serialize_str(FREE_SPACE_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CellVisitor)
    }
}

struct CellVisitor;

impl Visitor<'_> for CellVisitor {
    type Value = Cell;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer in 0..=255, a numeric string, or the free-space marker \"X\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cell, E> {
        u8::try_from(v)
            .map(Cell::Number)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cell, E> {
        u8::try_from(v)
            .map(Cell::Number)
            .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Cell, E> {
        let trimmed = v.trim();
        if trimmed.eq_ignore_ascii_case(FREE_SPACE_MARKER) {
            return Ok(Cell::FreeSpace);
        }
        trimmed
            .parse::<u8>()
            .map(Cell::Number)
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

/// One mark named in a win claim.
///
/// Values that cannot be a cell are kept as written so the claim can still be
/// adjudicated and rejected, instead of the whole frame failing to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimedMark {
    Cell(Cell),
    /// Out-of-range number or unrecognised string, as sent.
    Unreadable(String),
}

impl ClaimedMark {
    #[must_use]
    pub fn cell(&self) -> Option<Cell> {
        match self {
            ClaimedMark::Cell(cell) => Some(*cell),
            ClaimedMark::Unreadable(_) => None,
        }
    }
}

impl From<Cell> for ClaimedMark {
    fn from(cell: Cell) -> Self {
        ClaimedMark::Cell(cell)
    }
}

impl Serialize for ClaimedMark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClaimedMark::Cell(cell) => cell.serialize(serializer),
            ClaimedMark::Unreadable(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for ClaimedMark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match Cell::deserialize(&value) {
            Ok(cell) => ClaimedMark::Cell(cell),
            Err(_) => ClaimedMark::Unreadable(match value {
                Value::String(raw) => raw,
                other => other.to_string(),
            }),
        })
    }
}

/// A participant's card: ordered rows of cells.
///
/// Geometry is not enforced on the wire. Row/column/diagonal accessors
/// tolerate ragged grids by skipping missing cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card(Vec<Vec<Cell>>);

impl Card {
    #[must_use]
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self(rows)
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.0
    }

    /// True when the card holds no cells at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.0.len()
    }

    /// Width of the widest row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.0.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.0.iter().flatten().copied()
    }

    #[must_use]
    pub fn has_free_space(&self) -> bool {
        self.cells().any(Cell::is_free_space)
    }

    #[must_use]
    pub fn contains_number(&self, number: u8) -> bool {
        self.cells().any(|c| c == Cell::Number(number))
    }

    /// Cells of column `index`, top to bottom.
    #[must_use]
    pub fn column(&self, index: usize) -> Vec<Cell> {
        self.0.iter().filter_map(|row| row.get(index).copied()).collect()
    }

    /// Top-left to bottom-right diagonal.
    #[must_use]
    pub fn diagonal(&self) -> Vec<Cell> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(i).copied())
            .collect()
    }

    /// Top-right to bottom-left diagonal.
    #[must_use]
    pub fn anti_diagonal(&self) -> Vec<Cell> {
        let last = self.height().saturating_sub(1);
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(last - i).copied())
            .collect()
    }
}

impl From<Vec<Vec<Cell>>> for Card {
    fn from(rows: Vec<Vec<Cell>>) -> Self {
        Self(rows)
    }
}

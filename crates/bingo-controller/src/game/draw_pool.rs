//! Draw pool: undrawn numbers plus the ordered history of draws.
//!
//! Invariant: `available` and `history` are disjoint and together cover the
//! configured range exactly.

use rand::Rng;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Lowest number of the standard 75-ball pool.
pub const DEFAULT_POOL_MIN: u8 = 1;

/// Highest number of the standard 75-ball pool.
pub const DEFAULT_POOL_MAX: u8 = 75;

/// Draw errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every number in the range has been drawn.
    #[error("draw pool exhausted")]
    Exhausted,
}

/// Range bounds are inverted or include zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid pool range {min}..={max}")]
pub struct PoolRangeError {
    pub min: u8,
    pub max: u8,
}

/// Inclusive range of drawable numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRange {
    min: u8,
    max: u8,
}

impl PoolRange {
    /// Create a range. Zero is reserved and `min` must not exceed `max`.
    ///
    /// # Errors
    ///
    /// Returns `PoolRangeError` for an empty range or one starting at 0.
    pub fn new(min: u8, max: u8) -> Result<Self, PoolRangeError> {
        if min == 0 || min > max {
            return Err(PoolRangeError { min, max });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub const fn min(&self) -> u8 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> u8 {
        self.max
    }

    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.max - self.min) + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn contains(&self, number: u8) -> bool {
        self.as_range().contains(&number)
    }

    fn as_range(self) -> RangeInclusive<u8> {
        self.min..=self.max
    }
}

impl Default for PoolRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_POOL_MIN,
            max: DEFAULT_POOL_MAX,
        }
    }
}

/// The shared draw pool.
#[derive(Debug, Clone)]
pub struct DrawPool {
    range: PoolRange,
    available: Vec<u8>,
    history: Vec<u8>,
}

impl DrawPool {
    /// Create a full pool over `range`.
    #[must_use]
    pub fn new(range: PoolRange) -> Self {
        Self {
            range,
            available: range.as_range().collect(),
            history: Vec::with_capacity(range.len()),
        }
    }

    /// Draw one number uniformly at random from the undrawn set.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Exhausted` when nothing is left to draw. The pool
    /// is left untouched; refilling it is the caller's decision.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<u8, PoolError> {
        if self.available.is_empty() {
            return Err(PoolError::Exhausted);
        }
        let index = rng.gen_range(0..self.available.len());
        let number = self.available.swap_remove(index);
        self.history.push(number);
        Ok(number)
    }

    /// Refill the pool and clear the history.
    pub fn reset(&mut self) {
        self.available = self.range.as_range().collect();
        self.history.clear();
    }

    /// Drawn numbers in draw order.
    #[must_use]
    pub fn history(&self) -> &[u8] {
        &self.history
    }

    /// Drawn numbers in ascending order, for display.
    #[must_use]
    pub fn sorted_history(&self) -> Vec<u8> {
        let mut sorted = self.history.clone();
        sorted.sort_unstable();
        sorted
    }

    #[must_use]
    pub fn is_drawn(&self, number: u8) -> bool {
        self.history.contains(&number)
    }

    /// Count of numbers still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.available.len()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.available.is_empty()
    }

    #[must_use]
    pub const fn range(&self) -> PoolRange {
        self.range
    }
}

impl Default for DrawPool {
    fn default() -> Self {
        Self::new(PoolRange::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn assert_partition(pool: &DrawPool) {
        let drawn: HashSet<u8> = pool.history().iter().copied().collect();
        assert_eq!(drawn.len(), pool.history().len(), "history has duplicates");
        assert_eq!(drawn.len() + pool.remaining(), pool.range().len());
        for n in pool.history() {
            assert!(pool.range().contains(*n));
        }
    }

    #[test]
    fn test_new_pool_is_full() {
        let pool = DrawPool::default();
        assert_eq!(pool.remaining(), 75);
        assert!(pool.history().is_empty());
    }

    #[test]
    fn test_draw_until_exhausted_keeps_partition() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pool = DrawPool::default();

        for _ in 0..75 {
            pool.draw(&mut rng).unwrap();
            assert_partition(&pool);
        }

        assert!(pool.is_exhausted());
        let all: HashSet<u8> = pool.history().iter().copied().collect();
        assert_eq!(all, (1..=75).collect());
        assert_eq!(pool.draw(&mut rng), Err(PoolError::Exhausted));
        assert_eq!(pool.history().len(), 75, "failed draw must not mutate");
    }

    #[test]
    fn test_history_keeps_draw_order_and_sorted_view() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut pool = DrawPool::default();
        let drawn: Vec<u8> = (0..10).map(|_| pool.draw(&mut rng).unwrap()).collect();

        assert_eq!(pool.history(), drawn.as_slice());
        let mut expected = drawn.clone();
        expected.sort_unstable();
        assert_eq!(pool.sorted_history(), expected);
        assert!(pool.is_drawn(drawn[3]));
    }

    #[test]
    fn test_reset_restores_full_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = DrawPool::default();
        for _ in 0..30 {
            pool.draw(&mut rng).unwrap();
        }

        pool.reset();

        assert_eq!(pool.remaining(), 75);
        assert!(pool.history().is_empty());
        assert_partition(&pool);
    }

    #[test]
    fn test_custom_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pool = DrawPool::new(PoolRange::new(10, 12).unwrap());

        let mut drawn: Vec<u8> = (0..3).map(|_| pool.draw(&mut rng).unwrap()).collect();
        drawn.sort_unstable();

        assert_eq!(drawn, vec![10, 11, 12]);
        assert_eq!(pool.draw(&mut rng), Err(PoolError::Exhausted));
    }

    #[test]
    fn test_single_number_range() {
        let range = PoolRange::new(90, 90).unwrap();
        assert_eq!(range.len(), 1);
        let mut pool = DrawPool::new(range);
        assert_eq!(pool.draw(&mut StdRng::seed_from_u64(0)), Ok(90));
    }

    #[test]
    fn test_invalid_ranges() {
        assert_eq!(
            PoolRange::new(0, 75),
            Err(PoolRangeError { min: 0, max: 75 })
        );
        assert_eq!(
            PoolRange::new(50, 10),
            Err(PoolRangeError { min: 50, max: 10 })
        );
    }

    #[test]
    fn test_draw_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut first_draw_counts = [0u32; 5];
        for _ in 0..5000 {
            let mut pool = DrawPool::new(PoolRange::new(1, 5).unwrap());
            let n = pool.draw(&mut rng).unwrap();
            first_draw_counts[usize::from(n - 1)] += 1;
        }
        for count in first_draw_counts {
            assert!((800..1200).contains(&count), "skewed count {count}");
        }
    }
}

//! Seeded target selection.
//!
//! Assigns shared targets to channels from a fixed, ordered pool, either as a
//! seed-reproducible shuffle or as a circular window.

use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// LCG multiplier.
pub const LCG_MULTIPLIER: u64 = 9301;
/// LCG increment.
pub const LCG_INCREMENT: u64 = 49297;
/// LCG modulus.
pub const LCG_MODULUS: u64 = 233_280;

/// Errors from selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Requested {requested} items but the pool only has {available}")]
    PoolTooSmall { requested: usize, available: usize },
}

/// How targets are picked from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Fisher-Yates shuffle driven by a seeded LCG. Without an explicit seed,
    /// one is derived from the wall clock and the caller string.
    Shuffle { seed: Option<u64> },
    /// Consecutive items starting at `start`, wrapping around the pool.
    Window { start: usize },
    /// Window starting at the beginning of the pool.
    #[default]
    Sequential,
}

/// Derive a shuffle seed: `now_millis` plus the sum of the caller's UTF-16 code units.
pub fn seed_from(caller: &str, now_millis: u64) -> u64 {
    caller
        .encode_utf16()
        .map(u64::from)
        .fold(now_millis, u64::wrapping_add)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Linear congruential generator yielding floats in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        // Reducing first yields the same sequence without overflow.
        Self {
            state: seed % LCG_MODULUS,
        }
    }

    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state as f64 / LCG_MODULUS as f64
    }
}

/// Selects items from a fixed ordered pool.
#[derive(Debug, Clone)]
pub struct SeededSelector<T> {
    pool: Vec<T>,
}

impl<T: Clone> SeededSelector<T> {
    pub fn new(pool: Vec<T>) -> Self {
        Self { pool }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// `n` distinct items in pseudo-random order. The same seed always yields
    /// the same permutation.
    pub fn shuffle_select(&self, seed: u64, n: usize) -> Result<Vec<T>, SelectionError> {
        self.check(n)?;

        let mut items = self.pool.clone();
        let mut rng = Lcg::new(seed);
        for i in (1..items.len()).rev() {
            let j = (rng.next_f64() * (i + 1) as f64).floor() as usize;
            items.swap(i, j);
        }
        items.truncate(n);
        Ok(items)
    }

    /// `n` items at indices `(start + i) % len`.
    pub fn window_select(&self, n: usize, start: usize) -> Result<Vec<T>, SelectionError> {
        self.check(n)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let len = self.pool.len();
        let start = start % len;
        Ok((0..n)
            .map(|i| self.pool[(start + i) % len].clone())
            .collect())
    }

    /// Select according to `mode`. `caller` feeds the derived shuffle seed.
    pub fn select(
        &self,
        mode: SelectionMode,
        caller: &str,
        n: usize,
    ) -> Result<Vec<T>, SelectionError> {
        match mode {
            SelectionMode::Shuffle { seed } => {
                let seed = seed.unwrap_or_else(|| seed_from(caller, now_millis()));
                self.shuffle_select(seed, n)
            }
            SelectionMode::Window { start } => self.window_select(n, start),
            SelectionMode::Sequential => self.window_select(n, 0),
        }
    }

    fn check(&self, n: usize) -> Result<(), SelectionError> {
        if n > self.pool.len() {
            return Err(SelectionError::PoolTooSmall {
                requested: n,
                available: self.pool.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pool() -> SeededSelector<char> {
        SeededSelector::new(vec!['a', 'b', 'c', 'd'])
    }

    #[test]
    fn test_window_wraps() {
        assert_eq!(pool().window_select(3, 3).unwrap(), vec!['d', 'a', 'b']);
        assert_eq!(
            pool().window_select(4, 0).unwrap(),
            vec!['a', 'b', 'c', 'd']
        );
        assert_eq!(pool().window_select(2, 9).unwrap(), vec!['b', 'c']);
        assert!(pool().window_select(0, 2).unwrap().is_empty());
    }

    #[test]
    fn test_window_rejects_oversized_request() {
        assert_eq!(
            pool().window_select(5, 0),
            Err(SelectionError::PoolTooSmall {
                requested: 5,
                available: 4
            })
        );
        let empty: SeededSelector<char> = SeededSelector::new(Vec::new());
        assert!(empty.window_select(0, 3).unwrap().is_empty());
    }

    #[test]
    fn test_shuffle_is_distinct_and_reproducible() {
        let selector = SeededSelector::new((0..50).collect::<Vec<u32>>());
        for seed in [0u64, 1, 42, 233_279, 1_733_000_000_123, u64::MAX] {
            for n in [0usize, 1, 7, 50] {
                let first = selector.shuffle_select(seed, n).unwrap();
                let second = selector.shuffle_select(seed, n).unwrap();
                assert_eq!(first, second);
                assert_eq!(first.len(), n);
                let unique: HashSet<_> = first.iter().collect();
                assert_eq!(unique.len(), n);
                assert!(first.iter().all(|x| *x < 50));
            }
        }
    }

    #[test]
    fn test_shuffle_rejects_oversized_request() {
        let selector = pool();
        for n in 5..10 {
            assert!(selector.shuffle_select(7, n).is_err());
        }
    }

    #[test]
    fn test_shuffle_known_permutation() {
        // seed 0: LCG yields 49297/233280, then (49297 * 9301 + 49297) % 233280 / 233280, ...
        let mut rng = Lcg::new(0);
        let first = rng.next_f64();
        assert!((first - 49297.0 / 233280.0).abs() < 1e-12);

        let selector = pool();
        let mut rng = Lcg::new(0);
        let mut expected = vec!['a', 'b', 'c', 'd'];
        for i in (1..4).rev() {
            let j = (rng.next_f64() * (i + 1) as f64).floor() as usize;
            expected.swap(i, j);
        }
        assert_eq!(selector.shuffle_select(0, 4).unwrap(), expected);
    }

    #[test]
    fn test_seed_from_sums_code_units() {
        assert_eq!(seed_from("", 1000), 1000);
        assert_eq!(seed_from("ab", 1000), 1000 + 97 + 98);
    }

    #[test]
    fn test_select_dispatch() {
        let selector = pool();
        assert_eq!(
            selector
                .select(SelectionMode::Window { start: 3 }, "x", 3)
                .unwrap(),
            vec!['d', 'a', 'b']
        );
        assert_eq!(
            selector.select(SelectionMode::Sequential, "x", 2).unwrap(),
            vec!['a', 'b']
        );
        assert_eq!(
            selector
                .select(SelectionMode::Shuffle { seed: Some(9) }, "x", 4)
                .unwrap(),
            selector.shuffle_select(9, 4).unwrap()
        );
    }
}

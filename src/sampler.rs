//! Deterministic index and range selection.
//!
//! Every random choice in a conformance run flows through a [`Sampler`]
//! handle, so a failing run can be replayed from the seed it logs.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Longest window picked for the "short" half of [`Sampler::random_ranges`].
const SHORT_WINDOW: usize = 3;

/// A seeded pseudo-random source for index and range sampling.
pub struct Sampler {
    seed: u64,
    rng: StdRng,
}

impl Sampler {
    /// Creates a sampler whose choices are fully determined by `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Sampler {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a sampler from a fresh random seed.
    ///
    /// The seed is still recorded, see [`seed`](Sampler::seed).
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// The seed this sampler started from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derives an independent child sampler.
    ///
    /// The child's seed is drawn from `self`, so a family of forks is as
    /// reproducible as its root.
    #[must_use]
    pub fn fork(&mut self) -> Sampler {
        Sampler::new(self.rng.random())
    }

    /// Returns a lazy permutation of `0..n`.
    pub fn shuffled(&mut self, n: usize) -> ShuffledIndices {
        ShuffledIndices::new(n, self.rng.random())
    }

    /// Returns `min(k, n)` distinct indices from `0..n`, in random order.
    pub fn random_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, n, k.min(n)).into_vec()
    }

    /// Returns `min(k, n)` pairs `(start, limit)` with `start <= limit <= n`.
    ///
    /// Picks alternate between windows of any length and short windows of at
    /// most a few entries; both kinds include empty windows.
    pub fn random_ranges(&mut self, n: usize, k: usize) -> Vec<(usize, usize)> {
        (0..k.min(n))
            .map(|pick| {
                let start = self.rng.random_range(0..n);
                let room = n - start;
                let max_len = if pick % 2 == 0 { room } else { room.min(SHORT_WINDOW) };
                (start, start + self.rng.random_range(0..=max_len))
            })
            .collect()
    }

    /// Picks a uniform index in `0..n`.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn index(&mut self, n: usize) -> usize {
        self.rng.random_range(0..n)
    }

    /// Picks a uniform length in `lengths`.
    ///
    /// # Panics
    ///
    /// Panics if `lengths` is empty.
    pub fn length(&mut self, lengths: RangeInclusive<usize>) -> usize {
        self.rng.random_range(lengths)
    }

    /// Returns `len` random bytes.
    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        self.rng.fill(buf.as_mut_slice());
        buf
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler").field("seed", &self.seed).finish_non_exhaustive()
    }
}

/// A permutation of `0..n` produced one index at a time.
///
/// Two instances built with the same `n` and seed yield the same sequence.
pub struct ShuffledIndices {
    rng: StdRng,
    pool: Vec<usize>,
    taken: usize,
}

impl ShuffledIndices {
    #[must_use]
    pub fn new(n: usize, seed: u64) -> Self {
        ShuffledIndices {
            rng: StdRng::seed_from_u64(seed),
            pool: (0..n).collect(),
            taken: 0,
        }
    }
}

impl Iterator for ShuffledIndices {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.taken == self.pool.len() {
            return None;
        }
        let pick = self.rng.random_range(self.taken..self.pool.len());
        self.pool.swap(self.taken, pick);
        self.taken += 1;
        Some(self.pool[self.taken - 1])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.pool.len() - self.taken;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ShuffledIndices {}

impl FusedIterator for ShuffledIndices {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn same_seed_same_choices() {
        let mut a = Sampler::new(7);
        let mut b = Sampler::new(7);
        assert_eq!(a.shuffled(40).collect::<Vec<_>>(), b.shuffled(40).collect::<Vec<_>>());
        assert_eq!(a.random_indices(40, 10), b.random_indices(40, 10));
        assert_eq!(a.random_ranges(40, 10), b.random_ranges(40, 10));
        assert_eq!(a.fork().seed(), b.fork().seed());
    }

    #[test]
    fn shuffled_restarts_from_seed() {
        let first: Vec<_> = ShuffledIndices::new(25, 99).collect();
        let again: Vec<_> = ShuffledIndices::new(25, 99).collect();
        assert_eq!(first, again);
        assert_eq!(ShuffledIndices::new(0, 1).next(), None);
    }

    #[test]
    fn empty_population_yields_nothing() {
        let mut sampler = Sampler::new(1);
        assert!(sampler.random_indices(0, 50).is_empty());
        assert!(sampler.random_ranges(0, 50).is_empty());
    }

    #[test]
    fn ranges_cover_empty_and_wide_windows() {
        let mut sampler = Sampler::new(3);
        let ranges = sampler.random_ranges(10, 10);
        let ranges: Vec<_> = (0..50).flat_map(|_| sampler.random_ranges(10, 10)).chain(ranges).collect();
        assert!(ranges.iter().any(|(s, l)| s == l), "no empty window in {ranges:?}");
        assert!(ranges.iter().any(|(s, l)| l - s > SHORT_WINDOW), "no wide window in {ranges:?}");
    }

    proptest! {
        #[test]
        fn shuffled_is_a_permutation(n in 0usize..200, seed in any::<u64>()) {
            let mut seen: Vec<_> = Sampler::new(seed).shuffled(n).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }

        #[test]
        fn indices_are_distinct_and_bounded(n in 0usize..200, k in 0usize..80, seed in any::<u64>()) {
            let mut picked = Sampler::new(seed).random_indices(n, k);
            prop_assert_eq!(picked.len(), k.min(n));
            prop_assert!(picked.iter().all(|&i| i < n));
            picked.sort_unstable();
            picked.dedup();
            prop_assert_eq!(picked.len(), k.min(n));
        }

        #[test]
        fn ranges_are_ordered_and_bounded(n in 0usize..200, k in 0usize..80, seed in any::<u64>()) {
            let ranges = Sampler::new(seed).random_ranges(n, k);
            prop_assert_eq!(ranges.len(), k.min(n));
            for (start, limit) in ranges {
                prop_assert!(start <= limit && limit <= n, "{}..{} for n={}", start, limit, n);
            }
        }
    }
}

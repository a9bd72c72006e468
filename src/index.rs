//! Randomized, collision-free output positions.
//!
//! A photo frame plays files in name order. Handing out random positions
//! means every run shuffles the slideshow instead of replaying the library
//! in directory order.
//!
//! Positions are drawn uniformly from `[0, MAX_FILES)`. Usage is sparse
//! relative to the range, so the first draw almost always lands on a free
//! slot. After [`RANDOM_ATTEMPTS`] collisions the assigner falls back to a
//! linear probe from the last draw, which bounds the worst case.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use thiserror::Error;

/// Upper bound (exclusive) on output positions and on files per run.
pub const MAX_FILES: usize = 1_000_000;

/// Fresh random draws tried before switching to linear probing.
const RANDOM_ATTEMPTS: u32 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("cannot handle more than {capacity} files")]
pub struct CapacityError {
    pub capacity: usize,
}

pub struct IndexAssigner<R: Rng = StdRng> {
    rng: R,
    capacity: usize,
    used: HashSet<usize>,
}

impl IndexAssigner<StdRng> {
    /// Assigner over the full `[0, MAX_FILES)` range, seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng(), MAX_FILES)
    }

    /// Deterministic assigner for tests and reproducible runs.
    pub fn seeded(seed: u64, capacity: usize) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), capacity)
    }
}

impl Default for IndexAssigner<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> IndexAssigner<R> {
    pub fn with_rng(rng: R, capacity: usize) -> Self {
        Self {
            rng,
            capacity,
            used: HashSet::new(),
        }
    }

    /// Hand out the next unused position.
    pub fn next_index(&mut self) -> Result<usize, CapacityError> {
        if self.used.len() >= self.capacity {
            return Err(CapacityError {
                capacity: self.capacity,
            });
        }

        let mut candidate = self.draw();
        let mut attempts = RANDOM_ATTEMPTS;
        while self.used.contains(&candidate) {
            if attempts == 0 {
                while self.used.contains(&candidate) {
                    candidate = (candidate + 1) % self.capacity;
                }
                break;
            }
            attempts -= 1;
            candidate = self.draw();
        }

        self.used.insert(candidate);
        Ok(candidate)
    }

    /// Number of positions handed out so far.
    pub fn assigned(&self) -> usize {
        self.used.len()
    }

    fn draw(&mut self) -> usize {
        self.rng.random_range(0..self.capacity)
    }
}

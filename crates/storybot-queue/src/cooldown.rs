// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Randomized cooldown between dispatches.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Picks the pause that follows every dispatch.
///
/// With more than one candidate the previous window is never repeated.
#[derive(Debug)]
pub struct CooldownPolicy {
    candidates: Vec<Duration>,
    previous: Option<Duration>,
    rng: StdRng,
}

impl CooldownPolicy {
    pub fn new(candidates: Vec<Duration>) -> Self {
        Self::with_rng(candidates, StdRng::from_entropy())
    }

    /// Deterministic policy for tests.
    pub fn seeded(candidates: Vec<Duration>, seed: u64) -> Self {
        Self::with_rng(candidates, StdRng::seed_from_u64(seed))
    }

    fn with_rng(candidates: Vec<Duration>, rng: StdRng) -> Self {
        Self {
            candidates,
            previous: None,
            rng,
        }
    }

    pub fn next_window(&mut self) -> Duration {
        let previous = self.previous;
        let eligible: Vec<Duration> = self
            .candidates
            .iter()
            .copied()
            .filter(|w| Some(*w) != previous)
            .collect();
        let pool = if eligible.is_empty() {
            &self.candidates
        } else {
            &eligible
        };

        let window = pool
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Duration::ZERO);
        self.previous = Some(window);
        window
    }
}

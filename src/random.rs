//! Random Source
//!
//! TigerStyle: Randomness is an injected capability, never ambient.
//!
//! The unreliable wrapper only ever asks for "the next uniform float in
//! [0, 1)". Production uses the thread RNG, reproducible runs use a seeded
//! ChaCha stream, and tests script the exact draws.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Provider of uniform draws in [0, 1)
pub trait RandomSource: Send + Sync {
    /// Next value, `0.0 <= v < 1.0`
    fn next_uniform(&self) -> f64;
}

// =============================================================================
// Thread RNG
// =============================================================================

/// Non-deterministic source backed by `rand::thread_rng`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_uniform(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

// =============================================================================
// Seeded RNG
// =============================================================================

/// Deterministic source, same seed gives the same sequence
#[derive(Debug)]
pub struct SeededRandom {
    seed: u64,
    rng: Mutex<ChaCha8Rng>,
}

impl SeededRandom {
    /// Create a source from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// The seed this source was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn next_uniform(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen::<f64>()
    }
}

// =============================================================================
// Scripted
// =============================================================================

/// Replays a fixed list of draws, cycling when it runs out
#[derive(Debug)]
pub struct ScriptedRandom {
    draws: Mutex<VecDeque<f64>>,
}

impl ScriptedRandom {
    /// Create a scripted source
    ///
    /// # Panics
    /// Panics if `draws` is empty or holds a value outside [0, 1).
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        let draws: VecDeque<f64> = draws.into_iter().collect();
        assert!(!draws.is_empty(), "scripted source needs at least one draw");
        for draw in &draws {
            assert!(
                (0.0..1.0).contains(draw),
                "scripted draw {} outside [0, 1)",
                draw
            );
        }
        Self {
            draws: Mutex::new(draws),
        }
    }

    /// A source that always returns the same value
    pub fn constant(draw: f64) -> Self {
        Self::new([draw])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_uniform(&self) -> f64 {
        let mut draws = self.draws.lock().unwrap_or_else(PoisonError::into_inner);
        // Non-empty by construction; rotate so the script cycles.
        let draw = draws.pop_front().unwrap_or_default();
        draws.push_back(draw);
        draw
    }
}

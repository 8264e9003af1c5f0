//! Uniform randomness adapters
//!
//! - `SeededUniform`: xoshiro256++ seeded from a fixed value or from the OS
//! - `ScriptedUniform`: replays a fixed sequence and counts draws

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::domain::ports::UniformSource;

/// Production uniform source backed by `Xoshiro256PlusPlus`
#[derive(Debug, Clone)]
pub struct SeededUniform {
    rng: Xoshiro256PlusPlus,
}

impl SeededUniform {
    /// Deterministic generator for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Generator seeded from the thread-local entropy source
    pub fn from_entropy() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_rng(&mut rand::rng()),
        }
    }

    /// Seeded when `seed` is set, entropy-seeded otherwise
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl UniformSource for SeededUniform {
    fn next_uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Replays a fixed sequence of variates, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedUniform {
    values: Vec<f64>,
    draws: usize,
}

impl ScriptedUniform {
    /// `values` must not be empty
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "scripted uniform source needs at least one value");
        Self { values, draws: 0 }
    }

    /// Total number of variates handed out so far
    pub const fn draws(&self) -> usize {
        self.draws
    }
}

impl UniformSource for ScriptedUniform {
    fn next_uniform(&mut self) -> f64 {
        let value = self.values[self.draws % self.values.len()];
        self.draws += 1;
        value
    }
}

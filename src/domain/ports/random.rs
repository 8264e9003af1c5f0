//! Uniform randomness port
//!
//! The strategies never touch a concrete RNG. Production wires a seeded
//! xoshiro generator, tests and replays inject a scripted sequence.

use std::fmt::Debug;

/// Source of independent uniform variates in `[0, 1)`
pub trait UniformSource: Debug + Send {
    /// Draw the next variate
    fn next_uniform(&mut self) -> f64;
}

impl<T: UniformSource + ?Sized> UniformSource for Box<T> {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

//! Normal variates via the Marsaglia polar method.
//!
//! Every accepted rejection-sampling draw yields two independent variates.
//! The first is returned immediately, the second is cached and returned by
//! the following call without consuming any uniform draws.

use crate::domain::ports::UniformSource;

/// Gaussian generator with a single cached variate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaussianGenerator {
    cached: Option<f64>,
}

impl GaussianGenerator {
    /// A generator with no cached variate
    pub const fn new() -> Self {
        Self { cached: None }
    }

    /// Whether the next call will be served from the cache
    pub const fn has_pending(&self) -> bool {
        self.cached.is_some()
    }

    /// Draw `N(mean, std_dev²)`.
    pub fn next<U: UniformSource + ?Sized>(&mut self, uniform: &mut U, mean: f64, std_dev: f64) -> f64 {
        if let Some(cached) = self.cached.take() {
            return std_dev.mul_add(cached, mean);
        }

        let (u1, u2, w) = loop {
            let u1 = 2.0f64.mul_add(uniform.next_uniform(), -1.0);
            let u2 = 2.0f64.mul_add(uniform.next_uniform(), -1.0);
            let w = u1.mul_add(u1, u2 * u2);
            if w > 0.0 && w < 1.0 {
                break (u1, u2, w);
            }
        };

        let mult = (-2.0 * w.ln() / w).sqrt();
        self.cached = Some(u2 * mult);
        std_dev.mul_add(u1 * mult, mean)
    }
}

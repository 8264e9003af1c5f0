//! Budget-constrained query strategies.
//!
//! A [`QueryStrategy`] is built once from the selection configuration and
//! carries exactly the parameters and adaptive state its rule needs. Calling
//! [`QueryStrategy::decide`] never fails: degenerate parameters simply make
//! the strategy drop (or keep) everything.

use crate::domain::models::{SelectionConfig, StrategyKind, StrategyState};
use crate::domain::ports::UniformSource;

use super::gaussian::GaussianGenerator;

/// The four selection rules
#[derive(Debug)]
pub enum QueryStrategy {
    /// Select each record independently with probability `budget`
    Random {
        budget: f64,
        uniform: Box<dyn UniformSource>,
    },
    /// Select iff the probability is below a fixed threshold
    FixedUncertainty { labeling_threshold: f64 },
    /// Self-adjusting threshold with a rate brake
    VariableUncertainty {
        budget: f64,
        step: f64,
        state: StrategyState,
    },
    /// As `VariableUncertainty`, with the threshold jittered by `N(1, deviation²)`
    UncertaintyRandomized {
        budget: f64,
        step: f64,
        deviation: f64,
        state: StrategyState,
        gaussian: GaussianGenerator,
        uniform: Box<dyn UniformSource>,
    },
}

impl QueryStrategy {
    /// Build the strategy selected by `kind`
    ///
    /// `uniform` is only retained by the strategies that draw randomness.
    pub fn from_config(kind: StrategyKind, config: &SelectionConfig, uniform: Box<dyn UniformSource>) -> Self {
        match kind {
            StrategyKind::Random => Self::Random {
                budget: config.budget,
                uniform,
            },
            StrategyKind::FixedUncertainty => Self::FixedUncertainty {
                labeling_threshold: config.labeling_threshold,
            },
            StrategyKind::VariableUncertainty => Self::VariableUncertainty {
                budget: config.budget,
                step: config.step,
                state: StrategyState::new(),
            },
            StrategyKind::UncertaintyRandomized => Self::UncertaintyRandomized {
                budget: config.budget,
                step: config.step,
                deviation: config.deviation,
                state: StrategyState::new(),
                gaussian: GaussianGenerator::new(),
                uniform,
            },
        }
    }

    /// Tag of the configured variant
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Random { .. } => StrategyKind::Random,
            Self::FixedUncertainty { .. } => StrategyKind::FixedUncertainty,
            Self::VariableUncertainty { .. } => StrategyKind::VariableUncertainty,
            Self::UncertaintyRandomized { .. } => StrategyKind::UncertaintyRandomized,
        }
    }

    /// Adaptive state, for the strategies that keep one
    pub const fn state(&self) -> Option<&StrategyState> {
        match self {
            Self::VariableUncertainty { state, .. } | Self::UncertaintyRandomized { state, .. } => Some(state),
            _ => None,
        }
    }

    /// Replace the adaptive state, e.g. to shorten the rescale ceiling
    pub fn with_state(mut self, new_state: StrategyState) -> Self {
        if let Self::VariableUncertainty { state, .. } | Self::UncertaintyRandomized { state, .. } = &mut self {
            *state = new_state;
        }
        self
    }

    /// Decide whether the record with this predicted-class probability is forwarded
    pub fn decide(&mut self, probability: f64) -> bool {
        match self {
            Self::Random { budget, uniform } => uniform.next_uniform() < *budget,
            Self::FixedUncertainty { labeling_threshold } => probability < *labeling_threshold,
            Self::VariableUncertainty { budget, step, state } => {
                if !state.admit(*budget) {
                    return false;
                }
                let selected = probability < state.threshold();
                state.record_outcome(selected, *step);
                selected
            }
            Self::UncertaintyRandomized {
                budget,
                step,
                deviation,
                state,
                gaussian,
                uniform,
            } => {
                if !state.admit(*budget) {
                    return false;
                }
                let jitter = gaussian.next(&mut **uniform, 1.0, *deviation);
                let selected = probability < state.threshold() * jitter;
                state.record_outcome(selected, *step);
                selected
            }
        }
    }
}

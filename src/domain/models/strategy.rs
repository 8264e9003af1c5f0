//! Query strategy identifiers and the adaptive state shared by the
//! uncertainty strategies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ceiling of the processed-record counter before the periodic rescale
pub const T_MAX: u64 = 1_000_000_000;

/// Configuration-time tag selecting one of the four query strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Select with probability `budget`, ignoring the record
    Random,
    /// Select when the probability is below a fixed threshold
    FixedUncertainty,
    /// Adaptive threshold with a budget rate brake
    VariableUncertainty,
    /// Adaptive threshold perturbed by Gaussian noise
    UncertaintyRandomized,
}

impl StrategyKind {
    /// Map the numeric identifier used on the command line
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Random),
            1 => Some(Self::FixedUncertainty),
            2 => Some(Self::VariableUncertainty),
            3 => Some(Self::UncertaintyRandomized),
            _ => None,
        }
    }

    /// Numeric identifier, the inverse of [`from_id`](Self::from_id)
    pub const fn id(self) -> u8 {
        match self {
            Self::Random => 0,
            Self::FixedUncertainty => 1,
            Self::VariableUncertainty => 2,
            Self::UncertaintyRandomized => 3,
        }
    }

    /// Snake-case name used in logs and reports
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::FixedUncertainty => "fixed_uncertainty",
            Self::VariableUncertainty => "variable_uncertainty",
            Self::UncertaintyRandomized => "uncertainty_randomized",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adaptive counters of the variable uncertainty strategies
///
/// `success_estimate / processed_count` approximates the fraction of the
/// stream selected so far. Both counters are rescaled once `processed_count`
/// reaches the ceiling so they stay bounded on an endless stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyState {
    threshold: f64,
    success_estimate: f64,
    processed_count: u64,
    rescale_ceiling: u64,
}

impl Default for StrategyState {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyState {
    /// Initial state: threshold 1, one success, nothing processed yet
    pub const fn new() -> Self {
        Self::with_rescale_ceiling(T_MAX)
    }

    /// State with a custom rescale ceiling (must be at least 2)
    pub const fn with_rescale_ceiling(ceiling: u64) -> Self {
        Self {
            threshold: 1.0,
            success_estimate: 1.0,
            processed_count: 0,
            rescale_ceiling: if ceiling < 2 { 2 } else { ceiling },
        }
    }

    /// Current labeling threshold
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decayed count of selections
    pub const fn success_estimate(&self) -> f64 {
        self.success_estimate
    }

    /// Records admitted since the last rescale
    pub const fn processed_count(&self) -> u64 {
        self.processed_count
    }

    /// Counter value that triggers a rescale
    pub const fn rescale_ceiling(&self) -> u64 {
        self.rescale_ceiling
    }

    /// Realized selection rate estimate
    pub fn selection_rate(&self) -> f64 {
        if self.processed_count == 0 {
            return 0.0;
        }
        self.success_estimate / self.processed_count as f64
    }

    /// Count one record and report whether the budget still permits a selection.
    ///
    /// The periodic rescale happens here, before the rate check of the same call.
    pub fn admit(&mut self, budget: f64) -> bool {
        self.processed_count += 1;
        if self.processed_count >= self.rescale_ceiling {
            self.processed_count = 1;
            self.success_estimate /= self.rescale_ceiling as f64;
        }
        self.selection_rate() < budget
    }

    /// Record the outcome of an admitted comparison and adapt the threshold.
    pub fn record_outcome(&mut self, selected: bool, step: f64) {
        if selected {
            self.success_estimate += 1.0;
            self.threshold *= 1.0 - step;
        } else {
            self.threshold *= 1.0 + step;
        }
    }
}

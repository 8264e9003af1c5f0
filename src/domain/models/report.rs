//! Engine lifecycle states and the reports printed on shutdown.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::strategy::StrategyKind;

/// Lifecycle of an engine run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Waiting for the first schema announcement
    Idle,
    /// Processing records
    Running,
    /// End of stream, termination signal or closed transport seen
    Stopping,
    /// Terminal; counters are final
    Stopped,
}

impl EngineState {
    /// Lowercase name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

/// Lifetime counters of an engine run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Live records received (the end-of-stream marker is not counted)
    pub received: u64,
    /// Live records forwarded downstream
    pub forwarded: u64,
    /// Receive and send timeouts
    pub timeouts: u64,
    /// Sends that failed for reasons other than a timeout
    pub send_failures: u64,
    /// Records too short to hold the resolved fields
    pub malformed: u64,
    /// Whether the end-of-stream marker was propagated
    pub end_marker_forwarded: bool,
}

impl EngineStats {
    /// Share of received records that were forwarded, in percent
    pub fn forwarded_pct(&self) -> f64 {
        if self.received == 0 {
            return 0.0;
        }
        self.forwarded as f64 / self.received as f64 * 100.0
    }
}

/// Final report of a selection engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineReport {
    /// Strategy the run was configured with
    pub strategy: StrategyKind,
    /// State at the time of the report
    pub state: EngineState,
    /// Final counters
    #[serde(flatten)]
    pub stats: EngineStats,
    /// Forwarded share of received records, in percent
    pub forwarded_pct: f64,
    /// Wall time of the run, serialized as seconds
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl EngineReport {
    /// Assemble a report, deriving the forwarded percentage from `stats`
    pub fn new(strategy: StrategyKind, state: EngineState, stats: EngineStats, elapsed: Duration) -> Self {
        Self {
            strategy,
            state,
            stats,
            forwarded_pct: stats.forwarded_pct(),
            elapsed,
        }
    }
}

/// Final report of a blacklist filter run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterReport {
    /// Live records received
    pub received: u64,
    /// Records routed to the matched output
    pub matched: u64,
    /// Records routed to the unmatched output
    pub unmatched: u64,
    /// Receive and send timeouts
    pub timeouts: u64,
    /// Records too short to hold the resolved fields
    pub malformed: u64,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::try_from_secs_f64(secs).unwrap_or_default())
    }
}

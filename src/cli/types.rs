//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.
//! Option structs double as configuration overrides: every flag the user
//! leaves unset is skipped when serialized, so it cannot shadow the YAML file
//! or the environment.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// Top-level command line
#[derive(Parser, Debug)]
#[command(name = "salf")]
#[command(about = "Stream active-learning filter - budget-constrained record selection", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print the shutdown report in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./salf.yaml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Forward a budget-limited selection of records for labeling
    Select(SelectArgs),

    /// Route records by destination address and port against a blacklist
    Blacklist(BlacklistArgs),
}

/// Arguments of `salf select`
#[derive(Args, Debug, Clone)]
pub struct SelectArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub input: InputArgs,

    /// Output path, `-` for stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,
}

/// Selection options, serialized under `selection`
#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct SelectionArgs {
    /// Fraction of the stream that may be forwarded, in [0, 1]
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,

    /// Query strategy: 0 random, 1 fixed uncertainty, 2 variable uncertainty,
    /// 3 variable uncertainty with randomization
    #[arg(short = 'q', long = "query-strategy", value_name = "ID")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<u8>,

    /// Labeling threshold of the fixed uncertainty strategy
    #[arg(short = 't', long = "threshold")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labeling_threshold: Option<f64>,

    /// Threshold adjusting step of the variable strategies, in (0, 1)
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    /// Standard deviation of the threshold randomization
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation: Option<f64>,

    /// Do not forward the end-of-stream marker
    #[arg(short = 'n', long = "no-eof")]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub suppress_end_marker: bool,

    /// Name of the predicted-class probability field
    #[arg(long = "field", value_name = "NAME")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_field: Option<String>,

    /// Seed for reproducible random decisions
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Input interface options, serialized under `transport`
#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct InputArgs {
    /// Input path, `-` for stdin
    #[arg(short, long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Receive timeout in milliseconds, 0 waits forever
    #[arg(long, value_name = "MS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recv_timeout_ms: Option<u64>,

    /// Send timeout in milliseconds, 0 waits forever
    #[arg(long, value_name = "MS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_timeout_ms: Option<u64>,
}

/// Arguments of `salf blacklist`
#[derive(Args, Debug, Clone)]
pub struct BlacklistArgs {
    #[command(flatten)]
    pub filter: BlacklistFilterArgs,

    #[command(flatten)]
    pub input: InputArgs,
}

/// Blacklist options, serialized under `blacklist`
#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct BlacklistFilterArgs {
    /// Blacklist file, one `IP port` entry per line
    #[arg(short = 'b', long = "blacklist", value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Name of the destination address field
    #[arg(long, value_name = "NAME")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_field: Option<String>,

    /// Name of the destination port field
    #[arg(long, value_name = "NAME")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_field: Option<String>,

    /// Output for blacklisted records, `-` for stdout
    #[arg(short = 'm', long = "matched", value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_output: Option<String>,

    /// Output for all other records
    #[arg(short = 'u', long = "unmatched", value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmatched_output: Option<String>,
}

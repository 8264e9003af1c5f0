use serde::{Deserialize, Serialize};

/// Main configuration structure for SALF
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Query strategy and budget configuration
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Record transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Blacklist filter configuration
    #[serde(default)]
    pub blacklist: BlacklistConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Selection engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SelectionConfig {
    /// Fraction of the stream that may be forwarded, in [0, 1]
    #[serde(default = "default_budget")]
    pub budget: f64,

    /// Query strategy: 0 random, 1 fixed uncertainty, 2 variable uncertainty,
    /// 3 uncertainty with randomization
    #[serde(default)]
    pub strategy_id: u8,

    /// Labeling threshold of the fixed uncertainty strategy
    #[serde(default = "default_labeling_threshold")]
    pub labeling_threshold: f64,

    /// Threshold adjusting step of the variable strategies, in (0, 1)
    #[serde(default = "default_step")]
    pub step: f64,

    /// Standard deviation of the threshold randomization
    #[serde(default = "default_deviation")]
    pub deviation: f64,

    /// Do not propagate the end-of-stream marker downstream
    #[serde(default)]
    pub suppress_end_marker: bool,

    /// Name of the predicted-class probability field
    #[serde(default = "default_probability_field")]
    pub probability_field: String,

    /// Seed of the uniform source; entropy-seeded when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

pub(crate) const fn default_budget() -> f64 {
    0.5
}

pub(crate) const fn default_labeling_threshold() -> f64 {
    0.5
}

pub(crate) const fn default_step() -> f64 {
    0.4
}

pub(crate) const fn default_deviation() -> f64 {
    1.0
}

fn default_probability_field() -> String {
    "FEATURE_OUTPUT_PROBA".to_string()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            strategy_id: 0,
            labeling_threshold: default_labeling_threshold(),
            step: default_step(),
            deviation: default_deviation(),
            suppress_end_marker: false,
            probability_field: default_probability_field(),
            seed: None,
        }
    }
}

/// Record transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransportConfig {
    /// Input path, `-` for stdin
    #[serde(default = "default_stdio")]
    pub input: String,

    /// Output path, `-` for stdout
    #[serde(default = "default_stdio")]
    pub output: String,

    /// Receive timeout in milliseconds, 0 waits forever
    #[serde(default)]
    pub recv_timeout_ms: u64,

    /// Send timeout in milliseconds, 0 waits forever
    #[serde(default)]
    pub send_timeout_ms: u64,
}

fn default_stdio() -> String {
    "-".to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            input: default_stdio(),
            output: default_stdio(),
            recv_timeout_ms: 0,
            send_timeout_ms: 0,
        }
    }
}

/// Blacklist filter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BlacklistConfig {
    /// Blacklist file with one `IP port` entry per line
    #[serde(default)]
    pub path: Option<String>,

    /// Name of the destination address field
    #[serde(default = "default_ip_field")]
    pub ip_field: String,

    /// Name of the destination port field
    #[serde(default = "default_port_field")]
    pub port_field: String,

    /// Output for records matching the blacklist, `-` for stdout
    #[serde(default = "default_stdio")]
    pub matched_output: String,

    /// Output for records not matching the blacklist
    #[serde(default)]
    pub unmatched_output: Option<String>,
}

fn default_ip_field() -> String {
    "DST_IP".to_string()
}

fn default_port_field() -> String {
    "DST_PORT".to_string()
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            path: None,
            ip_field: default_ip_field(),
            port_field: default_port_field(),
            matched_output: default_stdio(),
            unmatched_output: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Log file rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

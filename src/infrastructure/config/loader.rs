use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::domain::models::config::{
    default_budget, default_deviation, default_labeling_threshold, default_step, Config,
};
use crate::domain::models::StrategyKind;

/// Configuration file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "salf.yaml";

/// Prefix of configuration environment variables, nested keys split on `__`
pub const ENV_PREFIX: &str = "SALF_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. YAML file: `path`, or `salf.yaml` in the working directory if present
    /// 3. Environment variables (`SALF_*`, `__` separates nested keys)
    /// 4. `overrides`, usually built from command-line flags
    ///
    /// The result is validated, then out-of-range numeric options are reset
    /// to their defaults.
    pub fn load<O: Serialize>(path: Option<&Path>, overrides: &O) -> Result<Config> {
        Self::extract(path, overrides).map(Self::normalize)
    }

    /// Merge and validate like [`load`](Self::load), without normalizing
    ///
    /// Lets the caller install a logger from `logging` before
    /// [`normalize`](Self::normalize) reports its fallbacks.
    pub fn extract<O: Serialize>(path: Option<&Path>, overrides: &O) -> Result<Config> {
        let file = match path {
            Some(path) if !path.exists() => return Err(ConfigError::MissingFile(path.to_path_buf()).into()),
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(&file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()
            .with_context(|| format!("Failed to extract configuration (file {})", file.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without environment or overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(Self::normalize(config))
    }

    /// Reject structurally invalid configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.selection.probability_field.trim().is_empty() {
            return Err(ConfigError::EmptyField("selection.probability_field"));
        }
        if config.blacklist.ip_field.trim().is_empty() {
            return Err(ConfigError::EmptyField("blacklist.ip_field"));
        }
        if config.blacklist.port_field.trim().is_empty() {
            return Err(ConfigError::EmptyField("blacklist.port_field"));
        }

        Ok(())
    }

    /// Reset out-of-range numeric options to their defaults, warning for each
    pub fn normalize(mut config: Config) -> Config {
        let selection = &mut config.selection;

        if !(0.0..=1.0).contains(&selection.budget) {
            warn!(budget = selection.budget, "budget must be in [0, 1], using default");
            selection.budget = default_budget();
        }

        if StrategyKind::from_id(selection.strategy_id).is_none() {
            warn!(
                strategy_id = selection.strategy_id,
                "unknown query strategy, using random"
            );
            selection.strategy_id = StrategyKind::Random.id();
        }

        if !selection.labeling_threshold.is_finite() {
            warn!(
                labeling_threshold = selection.labeling_threshold,
                "labeling threshold must be finite, using default"
            );
            selection.labeling_threshold = default_labeling_threshold();
        }

        if !(selection.step > 0.0 && selection.step < 1.0) {
            warn!(step = selection.step, "step must be in (0, 1), using default");
            selection.step = default_step();
        }

        if !(selection.deviation.is_finite() && selection.deviation >= 0.0) {
            warn!(
                deviation = selection.deviation,
                "deviation must be finite and non-negative, using default"
            );
            selection.deviation = default_deviation();
        }

        config
    }
}

//! Configuration management infrastructure
//!
//! Layered configuration using figment:
//! - programmatic defaults
//! - YAML file (`--config`, or `salf.yaml` when present)
//! - `SALF_*` environment variables
//! - command-line overrides
//!
//! followed by structural validation and numeric range fallback.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, DEFAULT_CONFIG_FILE, ENV_PREFIX};

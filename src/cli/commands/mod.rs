//! Subcommand implementations and the setup they share.

pub mod blacklist;
pub mod select;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use crate::cli::types::{BlacklistFilterArgs, InputArgs, SelectionArgs};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};

/// Command-line values layered over file and environment configuration
#[derive(Debug, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionArgs>,
    pub transport: TransportOverrides,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<BlacklistFilterArgs>,
    pub logging: LoggingOverrides,
}

/// Flags layered over the `transport` section
#[derive(Debug, Default, Serialize)]
pub struct TransportOverrides {
    #[serde(flatten)]
    pub input: InputArgs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Flags layered over the `logging` section
#[derive(Debug, Default, Serialize)]
pub struct LoggingOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Load the layered configuration and install the logger
///
/// The returned logger must stay alive for file output to be flushed.
pub fn prepare(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<(Config, LoggerImpl)> {
    configure(config_path, overrides, |config| {
        LoggerImpl::init(&LogConfig::from(&config.logging))
    })
}

/// Extract, install the logger, then normalize
///
/// Fallback warnings from normalization go through the freshly installed logger.
fn configure<L>(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    install_logger: impl FnOnce(&Config) -> Result<L>,
) -> Result<(Config, L)> {
    let config = ConfigLoader::extract(config_path, overrides).context("Failed to load configuration")?;
    let logger = install_logger(&config)?;
    Ok((ConfigLoader::normalize(config), logger))
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

//! Implementation of the `salf select` command.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::cli::commands::{prepare, shutdown_signal, ConfigOverrides, LoggingOverrides, TransportOverrides};
use crate::cli::output::output;
use crate::cli::types::SelectArgs;
use crate::infrastructure::transport::{open_sink, open_source, timeout_from_ms};
use crate::services::SelectionEngine;

/// Run the selection engine until end of stream or a termination signal
pub async fn execute(
    args: SelectArgs,
    cli_config: Option<&Path>,
    log_level: Option<String>,
    json_mode: bool,
) -> Result<()> {
    let overrides = ConfigOverrides {
        selection: Some(args.selection),
        transport: TransportOverrides {
            input: args.input,
            output: args.output,
        },
        blacklist: None,
        logging: LoggingOverrides { level: log_level },
    };
    let (config, _logger) = prepare(cli_config, &overrides)?;
    let transport = &config.transport;

    let source = open_source(&transport.input, timeout_from_ms(transport.recv_timeout_ms)).await?;
    let sink = open_sink(&transport.output, timeout_from_ms(transport.send_timeout_ms)).await?;

    let mut engine = SelectionEngine::from_config(source, sink, &config.selection);
    info!(
        strategy = %engine.strategy().kind(),
        budget = config.selection.budget,
        input = %transport.input,
        output = %transport.output,
        "starting selection engine"
    );

    let report = engine
        .run(shutdown_signal())
        .await
        .context("Selection engine stopped on a fatal error")?;

    output(&report, json_mode);
    Ok(())
}

//! Implementation of the `salf blacklist` command.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use crate::cli::commands::{prepare, shutdown_signal, ConfigOverrides, LoggingOverrides, TransportOverrides};
use crate::cli::output::output;
use crate::cli::types::BlacklistArgs;
use crate::infrastructure::transport::{open_sink, open_source, timeout_from_ms, STDIO};
use crate::services::{Blacklist, BlacklistFilter};

/// Route records against the configured blacklist
pub async fn execute(
    args: BlacklistArgs,
    cli_config: Option<&Path>,
    log_level: Option<String>,
    json_mode: bool,
) -> Result<()> {
    let overrides = ConfigOverrides {
        selection: None,
        transport: TransportOverrides {
            input: args.input,
            output: None,
        },
        blacklist: Some(args.filter),
        logging: LoggingOverrides { level: log_level },
    };
    let (config, _logger) = prepare(cli_config, &overrides)?;
    let settings = &config.blacklist;
    let transport = &config.transport;

    let Some(path) = settings.path.as_deref() else {
        bail!("No blacklist file given (use --blacklist or blacklist.path)");
    };
    let Some(unmatched_output) = settings.unmatched_output.as_deref() else {
        bail!("No output for unmatched records given (use --unmatched or blacklist.unmatched_output)");
    };
    if settings.matched_output == STDIO && unmatched_output == STDIO {
        bail!("Matched and unmatched records cannot both be written to stdout");
    }

    let blacklist = Blacklist::load(path).await?;
    let send_timeout = timeout_from_ms(transport.send_timeout_ms);
    let source = open_source(&transport.input, timeout_from_ms(transport.recv_timeout_ms)).await?;
    let matched = open_sink(&settings.matched_output, send_timeout).await?;
    let unmatched = open_sink(unmatched_output, send_timeout).await?;

    info!(
        entries = blacklist.len(),
        matched = %settings.matched_output,
        unmatched = %unmatched_output,
        "starting blacklist filter"
    );
    let mut filter = BlacklistFilter::new(source, matched, unmatched, blacklist)
        .with_fields(settings.ip_field.clone(), settings.port_field.clone());

    let report = filter
        .run(shutdown_signal())
        .await
        .with_context(|| format!("Blacklist filter stopped on a fatal error ({})", Path::new(path).display()))?;

    output(&report, json_mode);
    Ok(())
}

//! salf CLI entry point.

use clap::Parser;

use salf::cli::commands::{blacklist, select};
use salf::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Select(args) => select::execute(args, config, cli.log_level, cli.json).await,
        Commands::Blacklist(args) => blacklist::execute(args, config, cli.log_level, cli.json).await,
    };

    if let Err(err) = result {
        salf::cli::handle_error(&err, cli.json);
    }
}

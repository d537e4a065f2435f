mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use notifly_core::{NotificationService, WsConnector};

use crate::cli::{Cli, Command};
use crate::commands::util::TerminalConfirm;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a console connection
        Command::Config(ref args) => commands::config_cmd::handle(args, &cli.global),

        cmd => {
            let cfg = config::load_config_or_default();
            let resolved = config::resolve(&cli.global, &cfg)?;
            tracing::debug!(profile = %resolved.profile, api = %resolved.config.api_url, "resolved profile");

            let service = NotificationService::new(
                resolved.config,
                Arc::new(WsConnector),
                Arc::new(TerminalConfirm {
                    yes: cli.global.yes,
                }),
            );

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &service, resolved.token, &cli.global).await
        }
    }
}

mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wifigate_core::{Engine, LogMailer, PortalConfig};

use crate::cli::{Cli, Command, GlobalOpts};
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
        // Offline commands
        Command::Mac(args) => commands::mac::handle(&args, &cli.global),
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "wifigate", &mut std::io::stdout());
            Ok(())
        }

        // Everything else talks to the controller
        cmd => {
            let engine = Engine::new(portal_config(&cli.global)?, Arc::new(LogMailer));
            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &engine, &cli.global).await;
            engine.shutdown().await;
            result
        }
    }
}

/// Load the config file and environment, resolve the password and
/// validate everything into a `PortalConfig`.
fn portal_config(global: &GlobalOpts) -> Result<PortalConfig, CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(wifigate_config::config_path);
    let cfg = wifigate_config::load_config(Some(&path))?;

    if cfg.controller.url.trim().is_empty() {
        return Err(CliError::NoConfig {
            path: path.display().to_string(),
        });
    }

    let password = wifigate_config::resolve_password(&cfg.controller)?;
    Ok(wifigate_config::to_portal_config(&cfg, password)?)
}

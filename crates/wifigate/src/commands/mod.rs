//! Command handlers, one module per top-level subcommand.

pub mod allowlist;
pub mod config_cmd;
pub mod guest;
pub mod mac;
pub mod sync;

use wifigate_core::{Engine, MacAddress};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a controller-bound command to its handler.
pub async fn dispatch(cmd: Command, engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Allowlist(args) => allowlist::handle(engine, args, global).await,
        Command::Guest(args) => guest::handle(engine, args, global).await,
        Command::Sync(args) => sync::handle(engine, args, global).await,
        Command::Mac(_) | Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

/// Parse a user-supplied MAC, keeping the raw text for the error.
pub fn parse_mac(raw: &str) -> Result<MacAddress, CliError> {
    MacAddress::parse(raw).map_err(|e| CliError::invalid_mac(raw, e))
}

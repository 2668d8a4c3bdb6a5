//! Allow-list command handlers.

use std::collections::BTreeSet;

use serde::Serialize;
use tabled::Tabled;

use wifigate_core::{AllowListChange, Engine, MacAddress};

use crate::cli::{AllowlistArgs, AllowlistCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::parse_mac;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct MacRow {
    #[tabled(rename = "MAC")]
    mac: String,
}

impl From<&MacAddress> for MacRow {
    fn from(mac: &MacAddress) -> Self {
        Self {
            mac: mac.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChangeReport {
    ssid: String,
    requested: Vec<MacAddress>,
    #[serde(flatten)]
    change: AllowListChange,
}

fn detail(r: &ChangeReport) -> String {
    let outcome = match r.change {
        AllowListChange::Unchanged => "already satisfied, nothing sent".to_owned(),
        AllowListChange::Replaced { before, after } => format!("{before} -> {after} entries"),
    };
    [
        format!("SSID:      {}", r.ssid),
        format!("Requested: {}", r.requested.len()),
        format!("Result:    {outcome}"),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &Engine, args: AllowlistArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = engine.controller();
    let default_ssid = || engine.config().visitor_ssid.clone();

    match args.command {
        AllowlistCommand::Show { ssid } => {
            let ssid = ssid.unwrap_or_else(default_ssid);
            let macs: Vec<MacAddress> = controller.get_allow_list(&ssid).await?.into_iter().collect();
            let out = output::render_list(
                global.output,
                &macs,
                |m| MacRow::from(m),
                ToString::to_string,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
        AllowlistCommand::Add { macs, ssid } => {
            let ssid = ssid.unwrap_or_else(default_ssid);
            let macs = parse_all(&macs)?;
            let change = controller.add_to_allow_list(&ssid, &macs).await?;
            report(ssid, macs, change, global)
        }
        AllowlistCommand::Remove { macs, ssid } => {
            let ssid = ssid.unwrap_or_else(default_ssid);
            let macs = parse_all(&macs)?;
            let change = controller.remove_from_allow_list(&ssid, &macs).await?;
            report(ssid, macs, change, global)
        }
    }
}

/// Every argument must parse before anything is sent.
fn parse_all(raw: &[String]) -> Result<BTreeSet<MacAddress>, CliError> {
    raw.iter().map(|r| parse_mac(r)).collect()
}

fn report(
    ssid: String,
    macs: BTreeSet<MacAddress>,
    change: AllowListChange,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let report = ChangeReport {
        ssid,
        requested: macs.into_iter().collect(),
        change,
    };
    let out = output::render_single(global.output, &report, detail, |r| {
        let state = if r.change.wrote() { "changed" } else { "unchanged" };
        state.to_owned()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

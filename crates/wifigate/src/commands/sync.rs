//! `wifigate sync` handler.
//!
//! Converges SSID allow-lists to a device set supplied as JSON, e.g. an
//! export of the portal database:
//!
//! ```json
//! { "VISITANTES": ["aa:bb:cc:dd:ee:ff"], "Camara": ["11-22-33-44-55-66"] }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tabled::Tabled;

use wifigate_core::{Engine, MacAddress, SyncReport};

use crate::cli::{GlobalOpts, OutputFormat, SyncArgs};
use crate::error::CliError;
use crate::output;

use super::parse_mac;

type DesiredSets = BTreeMap<String, BTreeSet<MacAddress>>;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "SSID")]
    ssid: String,
    #[tabled(rename = "Desired")]
    desired: usize,
    #[tabled(rename = "Added")]
    added: usize,
    #[tabled(rename = "Removed")]
    removed: usize,
    #[tabled(rename = "Writes")]
    writes: usize,
}

impl From<&SyncReport> for ReportRow {
    fn from(r: &SyncReport) -> Self {
        Self {
            ssid: r.ssid.clone(),
            desired: r.desired,
            added: r.added,
            removed: r.removed,
            writes: r.writes,
        }
    }
}

/// What a real run would send for one SSID.
#[derive(Debug, Serialize)]
struct Plan {
    ssid: String,
    add: Vec<MacAddress>,
    remove: Vec<MacAddress>,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &Engine, args: SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let sets = select(read_desired(&args.devices)?, args.ssid.as_deref())?;

    if args.dry_run {
        let mut plans = Vec::with_capacity(sets.len());
        for (ssid, desired) in sets {
            let current = engine.controller().get_allow_list(&ssid).await?;
            plans.push(Plan {
                add: desired.difference(&current).cloned().collect(),
                remove: current.difference(&desired).cloned().collect(),
                ssid,
            });
        }
        return print_plans(&plans, global);
    }

    let mut reports = Vec::with_capacity(sets.len());
    for (ssid, desired) in &sets {
        reports.push(engine.reconciler().converge(ssid, desired).await?);
    }
    let out = output::render_list(
        global.output,
        &reports,
        |r| ReportRow::from(r),
        |r| format!("{} {}", r.ssid, r.writes),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Input ───────────────────────────────────────────────────────────

fn read_desired(path: &Path) -> Result<DesiredSets, CliError> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    parse_desired(&text)
}

/// Parse `{ ssid: [mac, ...] }`. Any malformed MAC fails the whole file.
fn parse_desired(text: &str) -> Result<DesiredSets, CliError> {
    let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(text)?;
    raw.into_iter()
        .map(|(ssid, macs)| {
            let macs = macs
                .iter()
                .map(|m| parse_mac(m))
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok((ssid, macs))
        })
        .collect()
}

fn select(mut sets: DesiredSets, only: Option<&str>) -> Result<DesiredSets, CliError> {
    let Some(ssid) = only else {
        return Ok(sets);
    };
    let desired = sets.remove(ssid).ok_or_else(|| CliError::Validation {
        field: "ssid".into(),
        reason: format!("'{ssid}' is not listed in the devices file"),
    })?;
    Ok(BTreeMap::from([(ssid.to_owned(), desired)]))
}

// ── Output ──────────────────────────────────────────────────────────

fn print_plans(plans: &[Plan], global: &GlobalOpts) -> Result<(), CliError> {
    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            let color = output::should_color(global.color);
            let mut lines = Vec::new();
            for plan in plans {
                lines.push(format!(
                    "{}: +{} -{}",
                    plan.ssid,
                    plan.add.len(),
                    plan.remove.len()
                ));
                lines.extend(plan.add.iter().map(|m| output::diff_line(true, m.as_str(), color)));
                lines.extend(plan.remove.iter().map(|m| output::diff_line(false, m.as_str(), color)));
            }
            lines.join("\n")
        }
        format => output::render_single(format, &plans, |_| String::new(), |_| String::new())?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn devices_file_is_canonicalized_per_ssid() {
        let sets = parse_desired(
            r#"{ "VISITANTES": ["aa-bb-cc-dd-ee-ff", "AA:BB:CC:DD:EE:FF"], "Camara": [] }"#,
        )
        .unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets["VISITANTES"].len(), 1);
        assert!(sets["Camara"].is_empty());
    }

    #[test]
    fn one_bad_mac_rejects_the_file() {
        let err = parse_desired(r#"{ "VISITANTES": ["aa:bb:cc:dd:ee:ff", "nope"] }"#).unwrap_err();
        assert!(matches!(err, CliError::InvalidMac { ref raw, .. } if raw == "nope"));
    }

    #[test]
    fn selecting_an_unlisted_ssid_is_a_usage_error() {
        let sets = parse_desired(r#"{ "VISITANTES": [] }"#).unwrap();
        let err = select(sets, Some("Camara")).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_code::USAGE);
    }
}

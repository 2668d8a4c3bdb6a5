//! Guest authorization command handlers.

use chrono::DateTime;
use serde::Serialize;

use wifigate_core::{Engine, GuestStatus};

use crate::cli::{GlobalOpts, GuestArgs, GuestCommand};
use crate::error::CliError;
use crate::output;

use super::parse_mac;

#[derive(Serialize)]
struct GuestAction {
    mac: String,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    minutes: Option<u32>,
}

fn status_detail(s: &GuestStatus) -> String {
    let opt = |v: Option<String>| v.unwrap_or_else(|| "-".into());
    [
        format!("MAC:        {}", s.mac),
        format!("Authorized: {}", s.authorized),
        format!("Expired:    {}", s.expired),
        format!("Expires:    {}", opt(s.expires_at.as_ref().map(DateTime::to_rfc3339))),
        format!("Hostname:   {}", opt(s.hostname.clone())),
        format!("IP:         {}", opt(s.ip.clone())),
        format!(
            "Traffic:    tx {} / rx {} bytes",
            opt(s.tx_bytes.as_ref().map(ToString::to_string)),
            opt(s.rx_bytes.as_ref().map(ToString::to_string))
        ),
        format!("Last seen:  {}", opt(s.last_seen.as_ref().map(DateTime::to_rfc3339))),
    ]
    .join("\n")
}

pub async fn handle(engine: &Engine, args: GuestArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = engine.controller();

    let action = match args.command {
        GuestCommand::Authorize { mac, minutes, ap } => {
            let mac = parse_mac(&mac)?;
            let ap = ap.as_deref().map(parse_mac).transpose()?;
            let minutes = minutes.unwrap_or(engine.config().guest_minutes);
            controller.authorize_guest(&mac, minutes, ap.as_ref()).await?;
            GuestAction {
                mac: mac.to_string(),
                action: "authorized",
                minutes: Some(minutes),
            }
        }
        GuestCommand::Revoke { mac, station } => {
            let mac = parse_mac(&mac)?;
            controller.unauthorize_guest(&mac).await?;
            if station {
                controller.unauthorize_station(&mac).await?;
            }
            GuestAction {
                mac: mac.to_string(),
                action: "revoked",
                minutes: None,
            }
        }
        GuestCommand::Status { mac } => {
            let mac = parse_mac(&mac)?;
            let status = controller
                .guest_status(&mac)
                .await?
                .ok_or_else(|| CliError::NoGuestSession {
                    mac: mac.to_string(),
                })?;
            let out = output::render_single(global.output, &status, status_detail, |s| {
                let state = if s.authorized && !s.expired { "authorized" } else { "unauthorized" };
                state.to_owned()
            })?;
            output::print_output(&out, global.quiet);
            return Ok(());
        }
    };

    let out = output::render_single(
        global.output,
        &action,
        |a| format!("{} {}", a.action, a.mac),
        |a| a.mac.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

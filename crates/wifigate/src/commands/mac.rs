//! `wifigate mac` handler.

use serde::Serialize;

use crate::cli::{GlobalOpts, MacArgs};
use crate::error::CliError;
use crate::output;

use super::parse_mac;

#[derive(Serialize)]
struct Normalized<'a> {
    raw: &'a str,
    mac: String,
}

pub fn handle(args: &MacArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mac = parse_mac(&args.raw)?;
    let normalized = Normalized {
        raw: &args.raw,
        mac: mac.to_string(),
    };
    let out = output::render_single(
        global.output,
        &normalized,
        |n| n.mac.clone(),
        |n| n.mac.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

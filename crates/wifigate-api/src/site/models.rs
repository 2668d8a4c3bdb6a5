// Site API response types
//
// Every response is wrapped in `Envelope<T>`. Fields use `#[serde(default)]`
// liberally because field presence varies across controller firmware.

use serde::{Deserialize, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard response envelope:
/// ```json
/// { "meta": { "rc": "ok", "msg": "optional" }, "data": [...] }
/// ```
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub meta: Meta,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Metadata from the envelope. `rc` == `"ok"` means success.
#[derive(Debug, Deserialize)]
pub struct Meta {
    pub rc: String,
    #[serde(default)]
    pub msg: Option<String>,
}

// ── WLAN ─────────────────────────────────────────────────────────────

/// SSID configuration object from `rest/wlanconf`.
///
/// Only the MAC-filter fields are modelled; the rest of the (large)
/// object lands in `extra` and is never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WlanConf {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub mac_filter_enabled: bool,
    /// `"allow"` (allow-list) or `"deny"`.
    #[serde(default)]
    pub mac_filter_policy: Option<String>,
    #[serde(default)]
    pub mac_filter_list: Vec<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body for `PUT rest/wlanconf/{id}` replacing the allow-list.
#[derive(Debug, Clone, Serialize)]
pub struct MacFilterUpdate<'a> {
    pub mac_filter_list: &'a [String],
    pub mac_filter_enabled: bool,
    pub mac_filter_policy: &'static str,
}

impl<'a> MacFilterUpdate<'a> {
    /// An allow-list replacement: filter on, policy `allow`.
    pub fn allow(list: &'a [String]) -> Self {
        Self {
            mac_filter_list: list,
            mac_filter_enabled: true,
            mac_filter_policy: "allow",
        }
    }
}

// ── Stations ─────────────────────────────────────────────────────────

/// Connected client from `stat/sta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationEntry {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub mac: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_guest: Option<bool>,
    #[serde(default)]
    pub authorized: Option<bool>,
    #[serde(default)]
    pub essid: Option<String>,
    #[serde(default)]
    pub ap_mac: Option<String>,
    #[serde(default)]
    pub last_seen: Option<i64>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Guest session from `stat/guest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestEntry {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub mac: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub authorized: bool,
    /// Unix seconds when the session started.
    #[serde(default)]
    pub start: Option<i64>,
    /// Unix seconds when the authorization expires.
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub expired: Option<bool>,
    #[serde(default)]
    pub tx_bytes: Option<i64>,
    #[serde(default)]
    pub rx_bytes: Option<i64>,
    #[serde(default)]
    pub last_seen: Option<i64>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

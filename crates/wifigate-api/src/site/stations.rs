// Station and guest endpoints
//
// Listings via stat/sta and stat/guest, guest commands via cmd/stamgr.

use serde::Serialize;
use tracing::debug;

use crate::error::Error;
use crate::site::client::SiteClient;
use crate::site::models::{GuestEntry, StationEntry};

/// Optional bandwidth and transfer caps for a guest authorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuestLimits {
    /// Upload limit (Kbps).
    pub up_kbps: Option<u32>,
    /// Download limit (Kbps).
    pub down_kbps: Option<u32>,
    /// Data transfer quota (MB).
    pub quota_mb: Option<u32>,
}

#[derive(Serialize)]
struct AuthorizeGuest<'a> {
    cmd: &'static str,
    mac: &'a str,
    minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    up: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    down: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ap_mac: Option<&'a str>,
}

#[derive(Serialize)]
struct MacCommand<'a> {
    cmd: &'static str,
    mac: &'a str,
}

impl SiteClient {
    /// List all currently connected clients (stations).
    ///
    /// `GET /api/s/{site}/stat/sta`
    pub async fn list_stations(&self) -> Result<Vec<StationEntry>, Error> {
        let url = self.site_url("stat/sta")?;
        debug!("listing connected stations");
        self.get(url).await
    }

    /// List guest sessions known to the hotspot manager.
    ///
    /// `GET /api/s/{site}/stat/guest`
    pub async fn list_guests(&self) -> Result<Vec<GuestEntry>, Error> {
        let url = self.site_url("stat/guest")?;
        debug!("listing guests");
        self.get(url).await
    }

    /// Authorize a guest client.
    ///
    /// `POST /api/s/{site}/cmd/stamgr` with
    /// `{"cmd": "authorize-guest", "mac": "...", "minutes": N}`.
    /// `minutes = 0` means no expiry. `ap_mac` hints which AP the client
    /// is associated with.
    pub async fn authorize_guest(
        &self,
        mac: &str,
        minutes: u32,
        limits: GuestLimits,
        ap_mac: Option<&str>,
    ) -> Result<(), Error> {
        let url = self.site_url("cmd/stamgr")?;
        debug!(mac, minutes, ?ap_mac, "authorizing guest");

        let body = AuthorizeGuest {
            cmd: "authorize-guest",
            mac,
            minutes,
            up: limits.up_kbps,
            down: limits.down_kbps,
            bytes: limits.quota_mb,
            ap_mac,
        };

        let _: Vec<serde_json::Value> = self.post(url, &body).await?;
        Ok(())
    }

    /// Revoke a guest authorization.
    ///
    /// `POST /api/s/{site}/cmd/stamgr` with `{"cmd": "unauthorize-guest", "mac": "..."}`
    pub async fn unauthorize_guest(&self, mac: &str) -> Result<(), Error> {
        self.stamgr(MacCommand {
            cmd: "unauthorize-guest",
            mac,
        })
        .await
    }

    /// Revoke a station's authorization outright.
    ///
    /// `POST /api/s/{site}/cmd/stamgr` with `{"cmd": "unauthorize-sta", "mac": "..."}`
    pub async fn unauthorize_station(&self, mac: &str) -> Result<(), Error> {
        self.stamgr(MacCommand {
            cmd: "unauthorize-sta",
            mac,
        })
        .await
    }

    async fn stamgr(&self, command: MacCommand<'_>) -> Result<(), Error> {
        let url = self.site_url("cmd/stamgr")?;
        debug!(cmd = command.cmd, mac = command.mac, "station manager command");
        let _: Vec<serde_json::Value> = self.post(url, &command).await?;
        Ok(())
    }
}

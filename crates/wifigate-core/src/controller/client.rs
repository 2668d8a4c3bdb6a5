// ── Controller client ──
//
// The only channel to the controller. Hides login, re-login on session
// expiry, platform detection and the allow-list cache behind a handful
// of allow-list and guest operations.

use std::collections::BTreeSet;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, warn};
use url::Url;

use wifigate_api::transport::TransportConfig;
use wifigate_api::{ControllerPlatform, GuestEntry, GuestLimits, SiteClient};

use super::cache::{AllowListCache, AllowListEntry};
use super::metrics::SyncMetrics;
use crate::clock::Clock;
use crate::config::PortalConfig;
use crate::error::ControllerError;
use crate::model::MacAddress;

/// Result of an allow-list mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum AllowListChange {
    /// The cached list already satisfied the request; nothing was sent.
    Unchanged,
    /// One replace-list call was sent.
    Replaced { before: usize, after: usize },
}

impl AllowListChange {
    pub fn wrote(self) -> bool {
        matches!(self, Self::Replaced { .. })
    }
}

/// Guest session state as reported by `stat/guest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestStatus {
    pub mac: MacAddress,
    pub authorized: bool,
    pub expired: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub tx_bytes: Option<i64>,
    pub rx_bytes: Option<i64>,
    pub last_seen: Option<DateTime<Utc>>,
}

pub struct ControllerClient {
    url: Url,
    site: String,
    username: String,
    password: SecretString,
    platform: Option<ControllerPlatform>,
    transport: TransportConfig,
    guest_limits: GuestLimits,
    /// Logged-in site client, created on first use.
    session: OnceCell<Arc<SiteClient>>,
    /// Serializes allow-list read-modify-write per SSID.
    ssid_locks: DashMap<String, Arc<Mutex<()>>>,
    cache: AllowListCache,
    clock: Arc<dyn Clock>,
    metrics: Arc<SyncMetrics>,
}

impl ControllerClient {
    pub fn new(config: &PortalConfig, clock: Arc<dyn Clock>, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            url: config.url.clone(),
            site: config.site.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            platform: config.platform,
            transport: config.transport(),
            guest_limits: GuestLimits {
                up_kbps: config.guest_up_kbps,
                down_kbps: config.guest_down_kbps,
                quota_mb: None,
            },
            session: OnceCell::new(),
            ssid_locks: DashMap::new(),
            cache: AllowListCache::new(config.allow_list_ttl),
            clock,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    // ── Allow-list ───────────────────────────────────────────────────

    /// Current allow-list of `ssid`, from cache when fresh.
    pub async fn get_allow_list(&self, ssid: &str) -> Result<BTreeSet<MacAddress>, ControllerError> {
        Ok(self.entry(ssid).await?.macs)
    }

    /// Ensure every MAC in `macs` is on the allow-list of `ssid`.
    ///
    /// Sends nothing when the cached list already contains them all.
    pub async fn add_to_allow_list(
        &self,
        ssid: &str,
        macs: &BTreeSet<MacAddress>,
    ) -> Result<AllowListChange, ControllerError> {
        let lock = self.ssid_lock(ssid);
        let _guard = lock.lock().await;

        let entry = self.entry(ssid).await?;
        let desired: BTreeSet<MacAddress> = entry.macs.union(macs).cloned().collect();
        self.replace(ssid, entry, desired).await
    }

    /// Ensure no MAC in `macs` is on the allow-list of `ssid`.
    pub async fn remove_from_allow_list(
        &self,
        ssid: &str,
        macs: &BTreeSet<MacAddress>,
    ) -> Result<AllowListChange, ControllerError> {
        let lock = self.ssid_lock(ssid);
        let _guard = lock.lock().await;

        let entry = self.entry(ssid).await?;
        let desired: BTreeSet<MacAddress> = entry.macs.difference(macs).cloned().collect();
        self.replace(ssid, entry, desired).await
    }

    fn ssid_lock(&self, ssid: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.ssid_locks.entry(ssid.to_owned()).or_default().value())
    }

    async fn entry(&self, ssid: &str) -> Result<AllowListEntry, ControllerError> {
        if let Some(entry) = self.cache.get_fresh(ssid, self.clock.now()) {
            self.metrics.record_cache(true);
            debug!(ssid, macs = entry.macs.len(), "allow-list cache hit");
            return Ok(entry);
        }
        self.metrics.record_cache(false);
        self.fetch(ssid).await
    }

    async fn fetch(&self, ssid: &str) -> Result<AllowListEntry, ControllerError> {
        let wlans = self
            .call("list_wlans", |api| async move { api.list_wlans().await })
            .await?;

        let Some(wlan) = wlans.into_iter().find(|w| w.name == ssid) else {
            error!(ssid, "SSID not found in controller WLAN configuration");
            return Err(ControllerError::SsidNotFound {
                ssid: ssid.to_owned(),
            });
        };

        let entry = AllowListEntry {
            wlan_id: wlan.id,
            macs: parse_remote_macs(ssid, &wlan.mac_filter_list),
            fetched_at: self.clock.now(),
        };
        debug!(ssid, wlan_id = %entry.wlan_id, macs = entry.macs.len(), "allow-list fetched");
        self.cache.store(ssid, entry.clone());
        self.metrics.set_allow_list_macs(self.cache.total_macs());
        Ok(entry)
    }

    async fn replace(
        &self,
        ssid: &str,
        current: AllowListEntry,
        desired: BTreeSet<MacAddress>,
    ) -> Result<AllowListChange, ControllerError> {
        if desired == current.macs {
            debug!(ssid, "allow-list already up to date");
            self.metrics.record_write(false);
            return Ok(AllowListChange::Unchanged);
        }

        let before = current.macs.len();
        let list: Vec<String> = desired.iter().map(ToString::to_string).collect();
        let wlan_id = current.wlan_id;
        info!(ssid, before, after = list.len(), "replacing allow-list");

        let result = self
            .call("replace_mac_filter", |api| {
                let wlan_id = wlan_id.clone();
                let list = list.clone();
                async move { api.replace_mac_filter(&wlan_id, &list).await }
            })
            .await;

        match result {
            Ok(Some(wlan)) => {
                // The controller's answer wins over what we asked for.
                let confirmed = parse_remote_macs(ssid, &wlan.mac_filter_list);
                let after = confirmed.len();
                self.cache.store(
                    ssid,
                    AllowListEntry {
                        wlan_id,
                        macs: confirmed,
                        fetched_at: self.clock.now(),
                    },
                );
                self.metrics.set_allow_list_macs(self.cache.total_macs());
                self.metrics.record_write(true);
                Ok(AllowListChange::Replaced { before, after })
            }
            Ok(None) => {
                debug!(ssid, "controller returned no WLAN object; dropping cached list");
                self.cache.invalidate(ssid);
                self.metrics.record_write(true);
                Ok(AllowListChange::Replaced {
                    before,
                    after: desired.len(),
                })
            }
            Err(e) => {
                self.cache.invalidate(ssid);
                Err(e)
            }
        }
    }

    // ── Guests ───────────────────────────────────────────────────────

    /// Authorize `mac` as a guest for `minutes` (0 = no expiry).
    ///
    /// Independent of the allow-list.
    pub async fn authorize_guest(
        &self,
        mac: &MacAddress,
        minutes: u32,
        ap_hint: Option<&MacAddress>,
    ) -> Result<(), ControllerError> {
        let mac_str = mac.to_string();
        let ap = ap_hint.map(ToString::to_string);
        let limits = self.guest_limits;
        self.call("authorize_guest", |api| {
            let mac = mac_str.clone();
            let ap = ap.clone();
            async move { api.authorize_guest(&mac, minutes, limits, ap.as_deref()).await }
        })
        .await?;
        info!(mac = %mac, minutes, "guest authorized");
        Ok(())
    }

    pub async fn unauthorize_guest(&self, mac: &MacAddress) -> Result<(), ControllerError> {
        let mac_str = mac.to_string();
        self.call("unauthorize_guest", |api| {
            let mac = mac_str.clone();
            async move { api.unauthorize_guest(&mac).await }
        })
        .await?;
        info!(mac = %mac, "guest unauthorized");
        Ok(())
    }

    /// Revoke a station's authorization outright (`unauthorize-sta`).
    pub async fn unauthorize_station(&self, mac: &MacAddress) -> Result<(), ControllerError> {
        let mac_str = mac.to_string();
        self.call("unauthorize_station", |api| {
            let mac = mac_str.clone();
            async move { api.unauthorize_station(&mac).await }
        })
        .await?;
        info!(mac = %mac, "station unauthorized");
        Ok(())
    }

    /// MAC of the connected client currently holding `ip`, if any.
    pub async fn resolve_client_mac(&self, ip: IpAddr) -> Result<Option<MacAddress>, ControllerError> {
        let stations = self
            .call("list_stations", |api| async move { api.list_stations().await })
            .await?;
        let wanted = ip.to_string();
        let mac = stations
            .into_iter()
            .find(|s| s.ip.as_deref() == Some(wanted.as_str()))
            .and_then(|s| MacAddress::parse(&s.mac).ok());
        debug!(%ip, mac = ?mac.as_ref().map(MacAddress::as_str), "resolved client MAC");
        Ok(mac)
    }

    /// Latest guest session for `mac`, if the controller knows one.
    pub async fn guest_status(&self, mac: &MacAddress) -> Result<Option<GuestStatus>, ControllerError> {
        let guests = self
            .call("list_guests", |api| async move { api.list_guests().await })
            .await?;
        Ok(guests
            .into_iter()
            .filter(|g| MacAddress::parse(&g.mac).is_ok_and(|m| m == *mac))
            .max_by_key(|g| g.end.unwrap_or(i64::MIN))
            .map(|g| guest_status(mac.clone(), g)))
    }

    /// End the controller session, if one was opened.
    pub async fn logout(&self) {
        if let Some(api) = self.session.get() {
            if let Err(e) = api.logout().await {
                debug!(error = %e, "logout failed");
            }
        }
    }

    // ── Session plumbing ─────────────────────────────────────────────

    async fn session(&self) -> Result<Arc<SiteClient>, ControllerError> {
        self.session
            .get_or_try_init(|| self.connect())
            .await
            .map(Arc::clone)
    }

    async fn connect(&self) -> Result<Arc<SiteClient>, ControllerError> {
        let platform = match self.platform {
            Some(p) => p,
            None => SiteClient::detect_platform(&self.url, &self.transport)
                .await
                .map_err(|e| log_failure("detect_platform", e.into()))?,
        };
        debug!(?platform, url = %self.url, site = %self.site, "connecting to controller");

        let api = SiteClient::new(self.url.clone(), self.site.clone(), platform, &self.transport)
            .map_err(|e| log_failure("connect", e.into()))?;
        self.login(&api).await?;
        Ok(Arc::new(api))
    }

    async fn login(&self, api: &SiteClient) -> Result<(), ControllerError> {
        api.login(&self.username, &self.password)
            .await
            .map_err(|e| log_failure("login", e.into()))?;
        info!(username = %self.username, "logged in to controller");
        Ok(())
    }

    /// Run one API call, logging in again and retrying once if the
    /// session expired. Timeouts are returned as is.
    async fn call<T, F, Fut>(&self, method: &'static str, op: F) -> Result<T, ControllerError>
    where
        F: Fn(Arc<SiteClient>) -> Fut,
        Fut: Future<Output = Result<T, wifigate_api::Error>>,
    {
        let api = self.session().await?;
        let started = Instant::now();

        let result = match op(Arc::clone(&api)).await {
            Err(e) if e.is_auth_expired() => {
                warn!(method, "controller session expired, logging in again");
                match self.login(&api).await {
                    Ok(()) => op(api).await.map_err(ControllerError::from),
                    Err(login_err) => Err(login_err),
                }
            }
            other => other.map_err(ControllerError::from),
        };

        self.metrics
            .record_request(method, result.is_ok(), started.elapsed());
        result.map_err(|e| log_failure(method, e))
    }
}

fn log_failure(method: &'static str, err: ControllerError) -> ControllerError {
    if err.is_configuration() {
        error!(method, error = %err, "controller call failed");
    } else {
        warn!(method, error = %err, "controller call failed");
    }
    err
}

/// Canonicalize the controller's list, dropping entries that are not MACs.
fn parse_remote_macs(ssid: &str, raw: &[String]) -> BTreeSet<MacAddress> {
    raw.iter()
        .filter_map(|m| match MacAddress::parse(m) {
            Ok(mac) => Some(mac),
            Err(e) => {
                warn!(ssid, entry = %m, error = %e, "ignoring malformed MAC in controller allow-list");
                None
            }
        })
        .collect()
}

fn guest_status(mac: MacAddress, g: GuestEntry) -> GuestStatus {
    let ts = |secs: Option<i64>| secs.and_then(|s| DateTime::from_timestamp(s, 0));
    GuestStatus {
        mac,
        authorized: g.authorized,
        expired: g.expired.unwrap_or(false),
        expires_at: ts(g.end),
        hostname: g.hostname,
        ip: g.ip,
        tx_bytes: g.tx_bytes,
        rx_bytes: g.rx_bytes,
        last_seen: ts(g.last_seen),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_remote_entries_are_dropped() {
        let raw = vec![
            "aa:bb:cc:dd:ee:ff".to_owned(),
            "garbage".to_owned(),
            "AA-BB-CC-DD-EE-FF".to_owned(),
            "11:22:33:44:55:66".to_owned(),
        ];
        let macs = parse_remote_macs("VISITANTES", &raw);
        let listed: Vec<&str> = macs.iter().map(MacAddress::as_str).collect();
        assert_eq!(listed, vec!["11:22:33:44:55:66", "AA:BB:CC:DD:EE:FF"]);
    }

    #[test]
    fn allow_list_change_reports_writes() {
        assert!(!AllowListChange::Unchanged.wrote());
        assert!(AllowListChange::Replaced { before: 1, after: 2 }.wrote());
    }
}

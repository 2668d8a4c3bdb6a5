// WLAN configuration endpoints
//
// Read SSID configuration and replace an SSID's MAC allow-list.

use tracing::debug;

use crate::error::Error;
use crate::site::client::SiteClient;
use crate::site::models::{MacFilterUpdate, WlanConf};

impl SiteClient {
    /// List all SSID configurations for the site.
    ///
    /// `GET /api/s/{site}/rest/wlanconf`
    pub async fn list_wlans(&self) -> Result<Vec<WlanConf>, Error> {
        let url = self.site_url("rest/wlanconf")?;
        debug!("listing WLAN configurations");
        self.get(url).await
    }

    /// Replace the MAC allow-list of one SSID.
    ///
    /// `PUT /api/s/{site}/rest/wlanconf/{id}` with
    /// `{"mac_filter_list": [...], "mac_filter_enabled": true, "mac_filter_policy": "allow"}`
    ///
    /// Returns the controller's view of the updated WLAN. Some firmware
    /// answers with an empty `data` array, in which case the caller must
    /// re-read to learn the confirmed list.
    pub async fn replace_mac_filter(
        &self,
        wlan_id: &str,
        macs: &[String],
    ) -> Result<Option<WlanConf>, Error> {
        let url = self.site_url(&format!("rest/wlanconf/{wlan_id}"))?;
        debug!(wlan_id, count = macs.len(), "replacing MAC filter list");
        let mut data: Vec<WlanConf> = self.put(url, &MacFilterUpdate::allow(macs)).await?;
        Ok(data.pop())
    }
}

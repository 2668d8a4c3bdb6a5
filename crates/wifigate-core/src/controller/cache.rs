// ── Allow-list cache ──
//
// Per-SSID snapshot of the controller's MAC filter list. Process-local,
// owned by `ControllerClient`; freshness is judged against an injected
// clock.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::clock::delta;
use crate::model::MacAddress;

/// One SSID's allow-list as last seen on the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListEntry {
    /// Controller-side WLAN id (`_id` in `rest/wlanconf`).
    pub wlan_id: String,
    pub macs: BTreeSet<MacAddress>,
    pub fetched_at: DateTime<Utc>,
}

impl AllowListEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < delta(ttl)
    }
}

#[derive(Debug)]
pub(crate) struct AllowListCache {
    entries: DashMap<String, AllowListEntry>,
    ttl: Duration,
}

impl AllowListCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// The entry for `ssid` if it is still within its TTL.
    pub(crate) fn get_fresh(&self, ssid: &str, now: DateTime<Utc>) -> Option<AllowListEntry> {
        self.entries
            .get(ssid)
            .filter(|e| e.is_fresh(now, self.ttl))
            .map(|e| e.value().clone())
    }

    pub(crate) fn store(&self, ssid: &str, entry: AllowListEntry) {
        self.entries.insert(ssid.to_owned(), entry);
    }

    pub(crate) fn invalidate(&self, ssid: &str) {
        self.entries.remove(ssid);
    }

    /// MAC count summed over every cached SSID.
    pub(crate) fn total_macs(&self) -> usize {
        self.entries.iter().map(|e| e.macs.len()).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(fetched_at: DateTime<Utc>, macs: &[&str]) -> AllowListEntry {
        AllowListEntry {
            wlan_id: "wlan-1".into(),
            macs: macs.iter().map(|m| MacAddress::parse(m).unwrap()).collect(),
            fetched_at,
        }
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = AllowListCache::new(Duration::from_secs(300));
        let t0 = Utc::now();
        cache.store("VISITANTES", entry(t0, &["aa:bb:cc:dd:ee:ff"]));

        assert!(cache.get_fresh("VISITANTES", t0).is_some());
        assert!(
            cache
                .get_fresh("VISITANTES", t0 + chrono::TimeDelta::seconds(299))
                .is_some()
        );
        assert!(
            cache
                .get_fresh("VISITANTES", t0 + chrono::TimeDelta::seconds(300))
                .is_none()
        );
        assert!(cache.get_fresh("Camara", t0).is_none());
    }

    #[test]
    fn invalidate_and_totals() {
        let cache = AllowListCache::new(Duration::from_secs(300));
        let t0 = Utc::now();
        cache.store("a", entry(t0, &["aa:bb:cc:dd:ee:01", "aa:bb:cc:dd:ee:02"]));
        cache.store("b", entry(t0, &["aa:bb:cc:dd:ee:03"]));
        assert_eq!(cache.total_macs(), 3);

        cache.invalidate("a");
        assert!(cache.get_fresh("a", t0).is_none());
        assert_eq!(cache.total_macs(), 1);
    }
}

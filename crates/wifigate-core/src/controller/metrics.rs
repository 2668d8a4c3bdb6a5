// ── Sync metrics ──
//
// In-process counters for controller traffic and reconciliation. There
// is no exporter; callers read a `MetricsSnapshot`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Default)]
struct RequestCounter {
    success: AtomicU64,
    error: AtomicU64,
    latency_micros: AtomicU64,
}

#[derive(Debug, Default)]
pub struct SyncMetrics {
    requests: DashMap<&'static str, RequestCounter>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    remote_writes: AtomicU64,
    skipped_writes: AtomicU64,
    bulk_success: AtomicU64,
    bulk_error: AtomicU64,
    allow_list_macs: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_request(&self, method: &'static str, ok: bool, elapsed: Duration) {
        let counter = self.requests.entry(method).or_default();
        if ok {
            counter.success.fetch_add(1, Ordering::Relaxed);
        } else {
            counter.error.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        counter.latency_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub(crate) fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_write(&self, performed: bool) {
        if performed {
            self.remote_writes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_bulk(&self, ok: bool) {
        if ok {
            self.bulk_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.bulk_error.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn set_allow_list_macs(&self, total: usize) {
        self.allow_list_macs
            .store(u64::try_from(total).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self
            .requests
            .iter()
            .map(|entry| {
                let c = entry.value();
                (
                    (*entry.key()).to_owned(),
                    RequestStats {
                        success: c.success.load(Ordering::Relaxed),
                        error: c.error.load(Ordering::Relaxed),
                        total_latency_ms: c.latency_micros.load(Ordering::Relaxed) / 1000,
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            requests,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            remote_writes: self.remote_writes.load(Ordering::Relaxed),
            skipped_writes: self.skipped_writes.load(Ordering::Relaxed),
            bulk_success: self.bulk_success.load(Ordering::Relaxed),
            bulk_error: self.bulk_error.load(Ordering::Relaxed),
            allow_list_macs: self.allow_list_macs.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestStats {
    pub success: u64,
    pub error: u64,
    pub total_latency_ms: u64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Per controller method (e.g. `list_wlans`, `replace_mac_filter`).
    pub requests: BTreeMap<String, RequestStats>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Replace-list calls actually sent.
    pub remote_writes: u64,
    /// Mutations that were already satisfied by the cached list.
    pub skipped_writes: u64,
    pub bulk_success: u64,
    pub bulk_error: u64,
    /// MACs across every cached allow-list, as of the last fetch.
    pub allow_list_macs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_method() {
        let m = SyncMetrics::new();
        m.record_request("list_wlans", true, Duration::from_millis(12));
        m.record_request("list_wlans", false, Duration::from_millis(3));
        m.record_request("replace_mac_filter", true, Duration::from_millis(1));
        m.record_cache(true);
        m.record_cache(false);
        m.record_cache(false);
        m.record_write(false);
        m.set_allow_list_macs(7);

        let s = m.snapshot();
        assert_eq!(
            s.requests["list_wlans"],
            RequestStats {
                success: 1,
                error: 1,
                total_latency_ms: 15
            }
        );
        assert_eq!(s.requests["replace_mac_filter"].success, 1);
        assert_eq!((s.cache_hits, s.cache_misses), (1, 2));
        assert_eq!(s.skipped_writes, 1);
        assert_eq!(s.remote_writes, 0);
        assert_eq!(s.allow_list_macs, 7);
    }
}

// ── Controller access ──
//
// Cached, session-managing wrapper around `wifigate_api::SiteClient`.

mod cache;
mod client;
pub mod metrics;

pub use cache::AllowListEntry;
pub use client::{AllowListChange, ControllerClient, GuestStatus};
pub use metrics::{MetricsSnapshot, RequestStats, SyncMetrics};

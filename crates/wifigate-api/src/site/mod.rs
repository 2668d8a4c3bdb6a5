// Site-scoped client modules
//
// Hand-written client for the controller endpoints a captive portal uses.
// Everything lives under `/api/s/{site}/...` and is wrapped in the
// standard `{ meta: { rc, msg }, data: [...] }` envelope.

pub mod auth;
pub mod client;
pub mod models;
pub mod stations;
pub mod wlan;

pub use client::SiteClient;

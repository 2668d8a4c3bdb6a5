// wifigate-api: async client for the controller's site-scoped REST surface
//
// Only the pieces a captive portal needs: cookie session login, WLAN
// MAC-filter read/replace, guest authorize/unauthorize, and the station
// and guest listings used to resolve IP -> MAC and guest status.

pub mod auth;
pub mod error;
pub mod site;
pub mod transport;

pub use auth::ControllerPlatform;
pub use error::Error;
pub use site::models::{GuestEntry, StationEntry, WlanConf};
pub use site::stations::GuestLimits;
pub use site::SiteClient;
pub use transport::{TlsMode, TransportConfig};

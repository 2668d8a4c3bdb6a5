// ── Runtime portal configuration ──
//
// Everything the engine needs to talk to the controller and to enforce
// its local policies. Built once at startup (by wifigate-config or a
// test) and handed to the constructors; core never reads files or env.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;
use wifigate_api::ControllerPlatform;
use wifigate_api::transport::{TlsMode, TransportConfig};

/// Default lifetime of a cached allow-list snapshot.
pub const DEFAULT_ALLOW_LIST_TTL: Duration = Duration::from_secs(300);
/// Default validity window of a verification code.
pub const DEFAULT_CODE_WINDOW: Duration = Duration::from_secs(10 * 60);
/// Default maximum number of simultaneously active devices per visitor.
pub const DEFAULT_DEVICE_QUOTA: usize = 3;
/// Default guest authorization duration on the controller (one day).
pub const DEFAULT_GUEST_MINUTES: u32 = 1440;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs). Default for local controllers.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one portal instance bound to one controller site.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Controller URL (e.g., `https://192.168.1.1:8443`).
    pub url: Url,
    /// Site to operate on (usually "default").
    pub site: String,
    pub username: String,
    pub password: SecretString,
    /// Platform override. `None` probes the controller on first use.
    pub platform: Option<ControllerPlatform>,
    pub tls: TlsVerification,
    /// Per-request timeout. Expiry surfaces as a transient network error.
    pub timeout: Duration,

    /// SSID whose allow-list mirrors active visitor devices.
    pub visitor_ssid: String,
    /// SSID whose allow-list mirrors staff devices, if staff are managed.
    pub staff_ssid: Option<String>,

    pub allow_list_ttl: Duration,
    pub code_window: Duration,
    pub device_quota: usize,

    /// Guest authorization duration. 0 means no expiry.
    pub guest_minutes: u32,
    pub guest_up_kbps: Option<u32>,
    pub guest_down_kbps: Option<u32>,
}

impl PortalConfig {
    /// Config with the documented defaults for everything but the
    /// controller location, credentials and visitor SSID.
    pub fn new(
        url: Url,
        username: impl Into<String>,
        password: SecretString,
        visitor_ssid: impl Into<String>,
    ) -> Self {
        Self {
            url,
            site: "default".into(),
            username: username.into(),
            password,
            platform: None,
            tls: TlsVerification::default(),
            timeout: wifigate_api::transport::DEFAULT_TIMEOUT,
            visitor_ssid: visitor_ssid.into(),
            staff_ssid: None,
            allow_list_ttl: DEFAULT_ALLOW_LIST_TTL,
            code_window: DEFAULT_CODE_WINDOW,
            device_quota: DEFAULT_DEVICE_QUOTA,
            guest_minutes: DEFAULT_GUEST_MINUTES,
            guest_up_kbps: None,
            guest_down_kbps: None,
        }
    }

    /// SSIDs this instance manages, visitor first.
    pub fn managed_ssids(&self) -> Vec<String> {
        let mut ssids = vec![self.visitor_ssid.clone()];
        ssids.extend(self.staff_ssid.clone());
        ssids
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> PortalConfig {
        PortalConfig::new(
            Url::parse("https://unifi.local:8443").unwrap(),
            "portal",
            SecretString::from("pw".to_string()),
            "VISITANTES",
        )
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = config();
        assert_eq!(c.site, "default");
        assert_eq!(c.timeout, Duration::from_secs(10));
        assert_eq!(c.allow_list_ttl, Duration::from_secs(300));
        assert_eq!(c.code_window, Duration::from_secs(600));
        assert_eq!(c.device_quota, 3);
        assert_eq!(c.guest_minutes, 1440);
        assert_eq!(c.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn managed_ssids_include_staff_when_set() {
        let mut c = config();
        assert_eq!(c.managed_ssids(), vec!["VISITANTES"]);
        c.staff_ssid = Some("Camara".into());
        assert_eq!(c.managed_ssids(), vec!["VISITANTES", "Camara"]);
    }

    #[test]
    fn transport_carries_timeout_and_cookie_jar() {
        let mut c = config();
        c.timeout = Duration::from_secs(3);
        c.tls = TlsVerification::SystemDefaults;
        let t = c.transport();
        assert_eq!(t.timeout, Duration::from_secs(3));
        assert!(t.cookie_jar.is_some());
        assert!(matches!(t.tls, TlsMode::System));
    }
}

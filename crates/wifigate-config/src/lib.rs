//! Configuration for wifigate.
//!
//! TOML file + `WIFIGATE_*` environment overrides, credential resolution
//! (env → keyring → plaintext), and translation to
//! `wifigate_core::PortalConfig`. The engine itself never reads files or
//! the environment; everything goes through here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use wifigate_core::config::{
    DEFAULT_ALLOW_LIST_TTL, DEFAULT_CODE_WINDOW, DEFAULT_DEVICE_QUOTA, DEFAULT_GUEST_MINUTES,
};
use wifigate_core::{ControllerPlatform, PortalConfig, TlsVerification};

/// Environment variable that overrides every other password source.
pub const PASSWORD_ENV: &str = "WIFIGATE_PASSWORD";

const KEYRING_SERVICE: &str = "wifigate";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for {username}")]
    NoCredentials { username: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerSection,

    #[serde(default)]
    pub portal: PortalSection,
}

/// Where the controller is and how to log in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerSection {
    /// Controller base URL (e.g., "https://192.168.1.1:8443").
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_site")]
    pub site: String,

    #[serde(default)]
    pub username: String,

    /// Plaintext password. Prefer the keyring or `WIFIGATE_PASSWORD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// "auto", "unifi-os" or "classic".
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Path to a custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification. Defaults to true: local controllers are
    /// usually self-signed.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            site: default_site(),
            username: String::new(),
            password: None,
            platform: default_platform(),
            ca_cert: None,
            insecure: default_insecure(),
            timeout: default_timeout(),
        }
    }
}

fn default_site() -> String {
    "default".into()
}
fn default_platform() -> String {
    "auto".into()
}
fn default_insecure() -> bool {
    true
}
fn default_timeout() -> u64 {
    10
}

/// Portal policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortalSection {
    #[serde(default)]
    pub visitor_ssid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_ssid: Option<String>,

    /// Allow-list cache lifetime, seconds.
    #[serde(default = "default_allow_list_ttl")]
    pub allow_list_ttl: u64,

    /// Verification code validity, seconds.
    #[serde(default = "default_code_window")]
    pub code_window: u64,

    #[serde(default = "default_device_quota")]
    pub device_quota: usize,

    /// Guest authorization duration in minutes, 0 for no expiry.
    #[serde(default = "default_guest_minutes")]
    pub guest_minutes: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_up_kbps: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_down_kbps: Option<u32>,
}

impl Default for PortalSection {
    fn default() -> Self {
        Self {
            visitor_ssid: String::new(),
            staff_ssid: None,
            allow_list_ttl: default_allow_list_ttl(),
            code_window: default_code_window(),
            device_quota: default_device_quota(),
            guest_minutes: default_guest_minutes(),
            guest_up_kbps: None,
            guest_down_kbps: None,
        }
    }
}

fn default_allow_list_ttl() -> u64 {
    DEFAULT_ALLOW_LIST_TTL.as_secs()
}
fn default_code_window() -> u64 {
    DEFAULT_CODE_WINDOW.as_secs()
}
fn default_device_quota() -> usize {
    DEFAULT_DEVICE_QUOTA
}
fn default_guest_minutes() -> u32 {
    DEFAULT_GUEST_MINUTES
}

impl Config {
    /// Copy with the plaintext password masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.controller.password.is_some() {
            copy.controller.password = Some("********".into());
        }
        copy
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "wifigate", "wifigate").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("wifigate");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then `WIFIGATE_*` variables.
///
/// Nested keys use a double underscore:
/// `WIFIGATE_PORTAL__VISITOR_SSID=VISITANTES`.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WIFIGATE_").split("__"))
}

pub fn from_figment(figment: &Figment) -> Result<Config, ConfigError> {
    Ok(figment.extract()?)
}

/// Load from the canonical path (or `path` when given) plus environment.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), "loading configuration");
    from_figment(&figment(&path))
}

// ── Credential resolution ───────────────────────────────────────────

/// Password from `WIFIGATE_PASSWORD`, then the system keyring
/// (`wifigate` / `{username}@{url}`), then the plaintext field.
pub fn resolve_password(controller: &ControllerSection) -> Result<SecretString, ConfigError> {
    let account = format!("{}@{}", controller.username, controller.url);
    first_secret(
        std::env::var(PASSWORD_ENV).ok(),
        || {
            keyring::Entry::new(KEYRING_SERVICE, &account)
                .and_then(|entry| entry.get_password())
                .ok()
        },
        controller.password.as_deref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        username: controller.username.clone(),
    })
}

fn first_secret(
    env: Option<String>,
    keyring: impl FnOnce() -> Option<String>,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    if let Some(pw) = env.filter(|pw| !pw.is_empty()) {
        debug!("password taken from environment");
        return Some(SecretString::from(pw));
    }
    if let Some(pw) = keyring() {
        debug!("password taken from keyring");
        return Some(SecretString::from(pw));
    }
    plaintext.map(|pw| SecretString::from(pw.to_owned()))
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_platform(raw: &str) -> Result<Option<ControllerPlatform>, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "auto" | "" => Ok(None),
        "unifi-os" | "unifi_os" | "unifios" => Ok(Some(ControllerPlatform::UnifiOs)),
        "classic" => Ok(Some(ControllerPlatform::ClassicController)),
        other => Err(invalid(
            "controller.platform",
            format!("expected 'auto', 'unifi-os' or 'classic', got '{other}'"),
        )),
    }
}

/// Validate `config` and build the engine configuration around an
/// already resolved password.
pub fn to_portal_config(config: &Config, password: SecretString) -> Result<PortalConfig, ConfigError> {
    let c = &config.controller;
    let p = &config.portal;

    if c.url.trim().is_empty() {
        return Err(invalid("controller.url", "must be set"));
    }
    let url: url::Url = c
        .url
        .parse()
        .map_err(|_| invalid("controller.url", format!("invalid URL: {}", c.url)))?;
    if c.username.trim().is_empty() {
        return Err(invalid("controller.username", "must be set"));
    }
    if c.timeout == 0 {
        return Err(invalid("controller.timeout", "must be at least 1 second"));
    }
    if p.visitor_ssid.trim().is_empty() {
        return Err(invalid("portal.visitor_ssid", "must be set"));
    }
    if p.staff_ssid.as_deref() == Some(p.visitor_ssid.as_str()) {
        return Err(invalid("portal.staff_ssid", "must differ from portal.visitor_ssid"));
    }
    if p.device_quota == 0 {
        return Err(invalid("portal.device_quota", "must be at least 1"));
    }
    if p.code_window == 0 {
        return Err(invalid("portal.code_window", "must be at least 1 second"));
    }

    let tls = if let Some(ref ca_path) = c.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else if c.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };

    let mut portal = PortalConfig::new(url, c.username.trim(), password, p.visitor_ssid.trim());
    portal.site.clone_from(&c.site);
    portal.platform = parse_platform(&c.platform)?;
    portal.tls = tls;
    portal.timeout = Duration::from_secs(c.timeout);
    portal.staff_ssid = p
        .staff_ssid
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    portal.allow_list_ttl = Duration::from_secs(p.allow_list_ttl);
    portal.code_window = Duration::from_secs(p.code_window);
    portal.device_quota = p.device_quota;
    portal.guest_minutes = p.guest_minutes;
    portal.guest_up_kbps = p.guest_up_kbps;
    portal.guest_down_kbps = p.guest_down_kbps;
    Ok(portal)
}

/// Load, resolve the password and translate in one go.
pub fn load_portal_config(path: Option<&Path>) -> Result<PortalConfig, ConfigError> {
    let config = load_config(path)?;
    let password = resolve_password(&config.controller)?;
    to_portal_config(&config, password)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
        [controller]
        url = "https://unifi.local:8443"
        username = "portal"
        password = "from-file"
        platform = "classic"

        [portal]
        visitor_ssid = "VISITANTES"
        staff_ssid = "Camara"
        device_quota = 5
        guest_minutes = 480
    "#;

    fn sample() -> Config {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(SAMPLE));
        from_figment(&figment).unwrap()
    }

    fn pw() -> SecretString {
        SecretString::from("pw".to_string())
    }

    #[test]
    fn file_values_override_defaults() {
        let cfg = sample();
        assert_eq!(cfg.controller.site, "default");
        assert_eq!(cfg.controller.timeout, 10);
        assert_eq!(cfg.portal.device_quota, 5);
        assert_eq!(cfg.portal.allow_list_ttl, 300);
        assert_eq!(cfg.portal.code_window, 600);
    }

    #[test]
    fn translates_to_portal_config() {
        let portal = to_portal_config(&sample(), pw()).unwrap();
        assert_eq!(portal.url.as_str(), "https://unifi.local:8443/");
        assert_eq!(portal.platform, Some(ControllerPlatform::ClassicController));
        assert_eq!(portal.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(portal.staff_ssid.as_deref(), Some("Camara"));
        assert_eq!(portal.device_quota, 5);
        assert_eq!(portal.guest_minutes, 480);
        assert_eq!(portal.timeout, Duration::from_secs(10));
        assert_eq!(portal.managed_ssids(), vec!["VISITANTES", "Camara"]);
    }

    #[test]
    fn validation_names_the_field() {
        let mut cfg = sample();
        cfg.portal.visitor_ssid = " ".into();
        let err = to_portal_config(&cfg, pw()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "portal.visitor_ssid"));

        let mut cfg = sample();
        cfg.controller.url = "not a url".into();
        let err = to_portal_config(&cfg, pw()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "controller.url"));

        let mut cfg = sample();
        cfg.controller.platform = "cloudkey".into();
        let err = to_portal_config(&cfg, pw()).unwrap_err();
        assert!(err.to_string().contains("cloudkey"));

        let mut cfg = sample();
        cfg.portal.staff_ssid = Some("VISITANTES".into());
        assert!(to_portal_config(&cfg, pw()).is_err());
    }

    #[test]
    fn custom_ca_wins_over_insecure() {
        let mut cfg = sample();
        cfg.controller.ca_cert = Some("/etc/ssl/unifi.pem".into());
        let portal = to_portal_config(&cfg, pw()).unwrap();
        assert_eq!(portal.tls, TlsVerification::CustomCa("/etc/ssl/unifi.pem".into()));

        cfg.controller.ca_cert = None;
        cfg.controller.insecure = false;
        let portal = to_portal_config(&cfg, pw()).unwrap();
        assert_eq!(portal.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn password_sources_in_order() {
        let env = first_secret(Some("env".into()), || Some("ring".into()), Some("file")).unwrap();
        assert_eq!(env.expose_secret(), "env");

        let ring = first_secret(None, || Some("ring".into()), Some("file")).unwrap();
        assert_eq!(ring.expose_secret(), "ring");

        let file = first_secret(Some(String::new()), || None, Some("file")).unwrap();
        assert_eq!(file.expose_secret(), "file");

        assert!(first_secret(None, || None, None).is_none());
    }

    #[test]
    fn redaction_masks_password_only() {
        let shown = sample().redacted();
        assert_eq!(shown.controller.password.as_deref(), Some("********"));
        assert_eq!(shown.controller.username, "portal");
    }

    #[test]
    fn environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            let path = jail.directory().join("config.toml");
            jail.set_env("WIFIGATE_PORTAL__VISITOR_SSID", "Hall");
            jail.set_env("WIFIGATE_CONTROLLER__TIMEOUT", "3");

            let cfg = load_config(Some(&path)).unwrap();
            assert_eq!(cfg.portal.visitor_ssid, "Hall");
            assert_eq!(cfg.controller.timeout, 3);
            assert_eq!(cfg.portal.staff_ssid.as_deref(), Some("Camara"));
            Ok(())
        });
    }
}

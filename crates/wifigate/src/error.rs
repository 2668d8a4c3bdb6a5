//! CLI error types with miette diagnostics.
//!
//! Maps config and controller failures into user-facing errors with
//! actionable help text and a stable exit code each.

use miette::Diagnostic;
use thiserror::Error;

use wifigate_config::ConfigError;
use wifigate_core::{ControllerError, MacParseError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the controller: {message}")]
    #[diagnostic(
        code(wifigate::connection_failed),
        help(
            "Check that the controller is running and reachable.\n\
             Raise controller.timeout in the config if it is just slow."
        )
    )]
    ConnectionFailed { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Controller login failed: {message}")]
    #[diagnostic(
        code(wifigate::auth_failed),
        help("Verify controller.username and the password (WIFIGATE_PASSWORD, keyring or config).")
    )]
    AuthFailed { message: String },

    #[error("No password configured for '{username}'")]
    #[diagnostic(
        code(wifigate::no_credentials),
        help(
            "Set WIFIGATE_PASSWORD, store it in the system keyring under\n\
             service 'wifigate', or set controller.password in the config."
        )
    )]
    NoCredentials { username: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("SSID '{ssid}' not found on the controller")]
    #[diagnostic(
        code(wifigate::ssid_not_found),
        help("SSID names are matched exactly, including case.")
    )]
    SsidNotFound { ssid: String },

    #[error("No guest session known for {mac}")]
    #[diagnostic(code(wifigate::not_found))]
    NoGuestSession { mac: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Controller rejected the request: {message}")]
    #[diagnostic(code(wifigate::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid MAC address '{raw}'")]
    #[diagnostic(
        code(wifigate::invalid_mac),
        help("Use six hex pairs, e.g. AA:BB:CC:DD:EE:FF, aa-bb-cc-dd-ee-ff or aabb.ccdd.eeff.")
    )]
    InvalidMac {
        raw: String,
        #[source]
        source: MacParseError,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wifigate::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("No controller configured")]
    #[diagnostic(
        code(wifigate::no_config),
        help(
            "Create a config file with [controller] and [portal] sections,\n\
             or set WIFIGATE_CONTROLLER__URL and friends.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(wifigate::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(wifigate::render))]
    Render(String),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(wifigate::json), help("Expected an object mapping SSID names to MAC arrays."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::SsidNotFound { .. } | Self::NoGuestSession { .. } => exit_code::NOT_FOUND,
            Self::InvalidMac { .. } | Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn invalid_mac(raw: &str, source: MacParseError) -> Self {
        Self::InvalidMac {
            raw: raw.to_owned(),
            source,
        }
    }
}

// ── Upstream error mapping ──────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { username } => Self::NoCredentials { username },
            other @ ConfigError::Figment(_) => Self::Config(Box::new(other)),
        }
    }
}

impl From<ControllerError> for CliError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::AuthenticationFailed { message } => Self::AuthFailed { message },
            ControllerError::SsidNotFound { ssid } => Self::SsidNotFound { ssid },
            ControllerError::TransientNetwork { message } => Self::ConnectionFailed { message },
            ControllerError::RemoteRejected { message } => Self::ApiError { message },
            ControllerError::Configuration { message } => Self::Validation {
                field: "controller".into(),
                reason: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_failures_keep_distinct_exit_codes() {
        let cases = [
            (
                ControllerError::AuthenticationFailed {
                    message: "bad".into(),
                },
                exit_code::AUTH,
            ),
            (
                ControllerError::SsidNotFound {
                    ssid: "VISITANTES".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                ControllerError::TransientNetwork {
                    message: "timed out".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                ControllerError::RemoteRejected {
                    message: "api.err.Invalid".into(),
                },
                exit_code::GENERAL,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(CliError::from(err).exit_code(), code);
        }
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "portal.visitor_ssid".into(),
            reason: "must be set".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("portal.visitor_ssid"));
    }
}

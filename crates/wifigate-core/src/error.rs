// ── Core error types ──
//
// One tagged type per operation so callers can tell validation, quota
// and remote failures apart without matching on message text. Remote
// errors never carry HTTP details: `From<wifigate_api::Error>` folds
// transport-layer failures into `ControllerError`.

use serde::Serialize;
use strum::Display;
use thiserror::Error;

use crate::model::{DeviceId, MacAddress, MacParseError, StaffDeviceId, VisitorId};

// ── Controller ───────────────────────────────────────────────────────

/// Failure talking to the remote controller.
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    /// The controller rejected our credentials (or a fresh login after
    /// session expiry failed).
    #[error("Controller login rejected: {message}")]
    AuthenticationFailed { message: String },

    /// No SSID with this name in the controller's WLAN configuration.
    #[error("SSID not found on controller: {ssid}")]
    SsidNotFound { ssid: String },

    /// Timeout or connection failure. The caller may retry later.
    #[error("Controller unreachable: {message}")]
    TransientNetwork { message: String },

    /// The controller answered with a structured error payload.
    #[error("Controller rejected the request: {message}")]
    RemoteRejected { message: String },

    /// Local controller settings are unusable (bad URL, unreadable CA).
    #[error("Controller configuration error: {message}")]
    Configuration { message: String },
}

impl ControllerError {
    /// Only network-level failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }

    /// Login and SSID problems need an operator, not a retry.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::SsidNotFound { .. } | Self::Configuration { .. }
        )
    }
}

impl From<wifigate_api::Error> for ControllerError {
    fn from(err: wifigate_api::Error) -> Self {
        use wifigate_api::Error as Api;
        match err {
            Api::Authentication { message } => Self::AuthenticationFailed { message },
            Api::SessionExpired => Self::AuthenticationFailed {
                message: "session expired and could not be renewed".into(),
            },
            Api::Transport(e) => Self::TransientNetwork {
                message: e.to_string(),
            },
            Api::InvalidUrl(e) => Self::Configuration {
                message: format!("invalid URL: {e}"),
            },
            Api::Tls(message) => Self::Configuration { message },
            Api::Api { message } => Self::RemoteRejected { message },
            Api::Deserialization { message, .. } => Self::RemoteRejected {
                message: format!("unreadable response: {message}"),
            },
        }
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// A write the registry refused because it would break an invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Visitor not found: {0}")]
    VisitorNotFound(VisitorId),

    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceId),

    #[error("Staff device not found: {0}")]
    StaffDeviceNotFound(StaffDeviceId),

    #[error("MAC {mac} is already active for another visitor")]
    DuplicateActiveMac { mac: MacAddress },

    #[error("MAC {mac} is already registered as a staff device")]
    DuplicateStaffMac { mac: MacAddress },

    #[error("Visitor {visitor_id} already has {quota} active devices")]
    QuotaExceeded { visitor_id: VisitorId, quota: usize },

    #[error("Verification code already used")]
    CodeAlreadyValidated,

    #[error("Verification code not found")]
    CodeNotFound,
}

// ── Device admission ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Visitor {visitor_id} already has the maximum of {quota} active devices")]
    QuotaExceeded { visitor_id: VisitorId, quota: usize },

    #[error("MAC {mac} is already the active device of another visitor")]
    DuplicateActiveMac { mac: MacAddress },

    #[error("Visitor not found: {0}")]
    VisitorNotFound(VisitorId),

    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceId),

    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for AdmissionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::QuotaExceeded { visitor_id, quota } => {
                Self::QuotaExceeded { visitor_id, quota }
            }
            RegistryError::DuplicateActiveMac { mac } | RegistryError::DuplicateStaffMac { mac } => {
                Self::DuplicateActiveMac { mac }
            }
            RegistryError::DeviceNotFound(id) => Self::DeviceNotFound(id),
            RegistryError::VisitorNotFound(id) => Self::VisitorNotFound(id),
            other @ (RegistryError::StaffDeviceNotFound(_)
            | RegistryError::CodeAlreadyValidated
            | RegistryError::CodeNotFound) => Self::Registry(other),
        }
    }
}

// ── Verification codes ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssuanceError {
    #[error("Visitor not found: {0}")]
    VisitorNotFound(VisitorId),
}

/// Why a submitted code was not accepted. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodeValidationError {
    #[error("No verification code matches")]
    InvalidCode,

    #[error("Code was requested from a different device")]
    WrongDevice,

    #[error("Code has expired")]
    Expired,

    #[error("Code was already used")]
    AlreadyUsed,
}

// ── Registration ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },

    #[error("Invalid MAC address: {0}")]
    InvalidMac(#[from] MacParseError),
}

// ── Mail ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
#[error("Mail delivery to {to} failed: {message}")]
pub struct MailError {
    pub to: String,
    pub message: String,
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The SSID is not one this instance manages, so there is no desired
    /// set to converge it to.
    #[error("SSID {ssid} is not managed by this portal")]
    Unmanaged { ssid: String },

    #[error(transparent)]
    Controller(#[from] ControllerError),
}

// ── Scheduling ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Reconcile interval must be greater than zero")]
    ZeroInterval,
}

// ── User-facing rejection ────────────────────────────────────────────

/// Reason code carried by a [`Rejection`], one per distinct user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidMac,
    VisitorNotFound,
    DeviceNotResolved,
    QuotaExceeded,
    DuplicateActiveMac,
    DeliveryFailed,
    InvalidCode,
    WrongDevice,
    CodeExpired,
    CodeAlreadyUsed,
    ControllerUnavailable,
}

impl RejectReason {
    /// Message shown to the visitor.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::InvalidMac => "The device address is not a valid MAC address.",
            Self::VisitorNotFound => "We could not find your registration. Please register again.",
            Self::DeviceNotResolved => {
                "We could not identify your device. Reconnect to the network and try again."
            }
            Self::QuotaExceeded => {
                "You already have the maximum number of active devices. Remove one and try again."
            }
            Self::DuplicateActiveMac => "This device is already registered to another visitor.",
            Self::DeliveryFailed => {
                "We could not send the verification email. Check your address and try again."
            }
            Self::InvalidCode => "The code you entered is not correct.",
            Self::WrongDevice => {
                "This code was requested from another device. Enter it on that device."
            }
            Self::CodeExpired => "This code has expired. Request a new one.",
            Self::CodeAlreadyUsed => "This code was already used. Request a new one.",
            Self::ControllerUnavailable => {
                "The network controller is unavailable. Try again later or contact support."
            }
        }
    }
}

/// Terminal failure of an authorization workflow step.
#[derive(Debug, Clone, Error)]
#[error("{reason}: {detail}")]
pub struct Rejection {
    pub reason: RejectReason,
    pub detail: String,
}

impl Rejection {
    pub fn new(reason: RejectReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.reason.user_message()
    }
}

impl From<MacParseError> for Rejection {
    fn from(err: MacParseError) -> Self {
        Self::new(RejectReason::InvalidMac, err.to_string())
    }
}

impl From<AdmissionError> for Rejection {
    fn from(err: AdmissionError) -> Self {
        let reason = match err {
            AdmissionError::QuotaExceeded { .. } => RejectReason::QuotaExceeded,
            AdmissionError::DuplicateActiveMac { .. } => RejectReason::DuplicateActiveMac,
            AdmissionError::VisitorNotFound(_)
            | AdmissionError::DeviceNotFound(_)
            | AdmissionError::Registry(_) => RejectReason::VisitorNotFound,
        };
        Self::new(reason, err.to_string())
    }
}

impl From<IssuanceError> for Rejection {
    fn from(err: IssuanceError) -> Self {
        Self::new(RejectReason::VisitorNotFound, err.to_string())
    }
}

impl From<CodeValidationError> for Rejection {
    fn from(err: CodeValidationError) -> Self {
        let reason = match err {
            CodeValidationError::InvalidCode => RejectReason::InvalidCode,
            CodeValidationError::WrongDevice => RejectReason::WrongDevice,
            CodeValidationError::Expired => RejectReason::CodeExpired,
            CodeValidationError::AlreadyUsed => RejectReason::CodeAlreadyUsed,
        };
        Self::new(reason, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn api_errors_map_into_taxonomy() {
        let rejected: ControllerError = wifigate_api::Error::Api {
            message: "api.err.InvalidObject".into(),
        }
        .into();
        assert!(matches!(
            rejected,
            ControllerError::RemoteRejected { ref message } if message == "api.err.InvalidObject"
        ));

        let auth: ControllerError = wifigate_api::Error::Authentication {
            message: "bad password".into(),
        }
        .into();
        assert!(auth.is_configuration());
        assert!(!auth.is_transient());

        let expired: ControllerError = wifigate_api::Error::SessionExpired.into();
        assert!(matches!(expired, ControllerError::AuthenticationFailed { .. }));
    }

    #[test]
    fn every_reject_reason_has_its_own_message() {
        let reasons = [
            RejectReason::InvalidMac,
            RejectReason::VisitorNotFound,
            RejectReason::DeviceNotResolved,
            RejectReason::QuotaExceeded,
            RejectReason::DuplicateActiveMac,
            RejectReason::DeliveryFailed,
            RejectReason::InvalidCode,
            RejectReason::WrongDevice,
            RejectReason::CodeExpired,
            RejectReason::CodeAlreadyUsed,
            RejectReason::ControllerUnavailable,
        ];
        let messages: HashSet<_> = reasons.iter().map(|r| r.user_message()).collect();
        assert_eq!(messages.len(), reasons.len());
    }

    #[test]
    fn code_failures_keep_distinct_reasons() {
        let expired: Rejection = CodeValidationError::Expired.into();
        let used: Rejection = CodeValidationError::AlreadyUsed.into();
        assert_eq!(expired.reason, RejectReason::CodeExpired);
        assert_eq!(used.reason, RejectReason::CodeAlreadyUsed);
        assert_ne!(expired.user_message(), used.user_message());
    }

    #[test]
    fn reject_reason_displays_snake_case() {
        assert_eq!(RejectReason::QuotaExceeded.to_string(), "quota_exceeded");
    }
}

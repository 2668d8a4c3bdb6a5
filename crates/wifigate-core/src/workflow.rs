// ── Authorization workflow ──
//
// Drives a visitor from registration to an authorized device:
//
//   Registered -> CodeIssued -> Validated -> DeviceActive -> RemoteAuthorized
//
// Any step can end in `Rejected` with a reason code. The last step is
// the only one that talks to the controller, and its failure does not
// undo the local activation: the device stays active and bulk sync
// converges the controller later.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::controller::ControllerClient;
use crate::error::{ControllerError, RegistrationError, RejectReason, Rejection};
use crate::mail::{Mailer, OutgoingMail};
use crate::model::{
    DeviceId, MacAddress, VerificationCode, Visitor, VisitorDevice, VisitorId, VisitorRegistration,
};
use crate::quota::DeviceQuotaPolicy;
use crate::store::Registry;
use crate::verification::VerificationCodeService;

pub type DeviceAdmissionResult = Result<VisitorDevice, Rejection>;
pub type CodeIssuanceResult = Result<VerificationCode, Rejection>;
pub type ValidationResult = Result<Authorization, Rejection>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Registered,
    CodeIssued,
    Validated,
    DeviceActive,
    RemoteAuthorized,
    Rejected,
}

/// Outcome of a successful code validation.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub visitor: Visitor,
    pub device: VisitorDevice,
    pub code: VerificationCode,
    /// `RemoteAuthorized`, or `DeviceActive` when the controller call failed.
    pub state: WorkflowState,
    pub remote_error: Option<ControllerError>,
}

impl Authorization {
    pub fn is_remote_confirmed(&self) -> bool {
        self.state == WorkflowState::RemoteAuthorized
    }
}

pub struct AuthorizationWorkflow {
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    quota: Arc<DeviceQuotaPolicy>,
    codes: Arc<VerificationCodeService>,
    controller: Arc<ControllerClient>,
    mailer: Arc<dyn Mailer>,
    guest_minutes: u32,
}

impl AuthorizationWorkflow {
    pub fn new(
        registry: Arc<Registry>,
        clock: Arc<dyn Clock>,
        quota: Arc<DeviceQuotaPolicy>,
        codes: Arc<VerificationCodeService>,
        controller: Arc<ControllerClient>,
        mailer: Arc<dyn Mailer>,
        guest_minutes: u32,
    ) -> Self {
        Self {
            registry,
            clock,
            quota,
            codes,
            controller,
            mailer,
            guest_minutes,
        }
    }

    /// Record a portal submission. A returning visitor (same email) gets
    /// their existing record back.
    pub fn register_visitor(
        &self,
        registration: VisitorRegistration,
    ) -> Result<Visitor, RegistrationError> {
        let visitor = registration.into_visitor(self.clock.now())?;
        if let Some(existing) = self.registry.visitor_by_email(&visitor.email) {
            debug!(visitor_id = %existing.id, "returning visitor");
            return Ok(existing);
        }
        Ok(self.registry.insert_visitor(visitor))
    }

    /// Issue a code for the device at `raw_mac` and mail it.
    ///
    /// If the mail cannot be sent the code is discarded before returning.
    pub async fn issue_code(&self, visitor_id: VisitorId, ip: IpAddr, raw_mac: &str) -> CodeIssuanceResult {
        let mac = MacAddress::parse(raw_mac)?;
        self.issue(visitor_id, ip, &mac).await
    }

    /// Like [`issue_code`](Self::issue_code), learning the MAC from the
    /// controller's view of who holds `ip`.
    pub async fn issue_code_from_ip(&self, visitor_id: VisitorId, ip: IpAddr) -> CodeIssuanceResult {
        let mac = match self.controller.resolve_client_mac(ip).await {
            Ok(Some(mac)) => mac,
            Ok(None) => {
                return Err(Rejection::new(
                    RejectReason::DeviceNotResolved,
                    format!("no connected client holds {ip}"),
                ));
            }
            Err(e) => {
                return Err(Rejection::new(RejectReason::ControllerUnavailable, e.to_string()));
            }
        };
        self.issue(visitor_id, ip, &mac).await
    }

    async fn issue(&self, visitor_id: VisitorId, ip: IpAddr, mac: &MacAddress) -> CodeIssuanceResult {
        let visitor = self.registry.visitor(visitor_id).ok_or_else(|| {
            Rejection::new(RejectReason::VisitorNotFound, format!("visitor {visitor_id}"))
        })?;

        let code = self.codes.issue(visitor_id, ip, mac)?;
        let mail = OutgoingMail::verification(&visitor, &code);
        if let Err(e) = self.mailer.send(&mail).await {
            self.codes.discard(code.id);
            warn!(visitor_id = %visitor_id, error = %e, "verification mail failed; code withdrawn");
            return Err(Rejection::new(RejectReason::DeliveryFailed, e.to_string()));
        }

        debug!(visitor_id = %visitor_id, state = %WorkflowState::CodeIssued, "workflow advanced");
        Ok(code)
    }

    /// Redeem a code from the device that requested it, activate the
    /// device and authorize it on the controller.
    pub async fn validate_code(&self, visitor_id: VisitorId, submitted: &str, raw_mac: &str) -> ValidationResult {
        let mac = MacAddress::parse(raw_mac)?;
        let code = self.codes.validate(visitor_id, submitted, &mac)?;

        let device = self.quota.admit(visitor_id, &mac, None).await?;
        let visitor = self
            .registry
            .set_visitor_authorized(visitor_id, true)
            .map_err(|e| Rejection::new(RejectReason::VisitorNotFound, e.to_string()))?;

        let (state, remote_error) = match self
            .controller
            .authorize_guest(&mac, self.guest_minutes, None)
            .await
        {
            Ok(()) => (WorkflowState::RemoteAuthorized, None),
            Err(e) => {
                if e.is_configuration() {
                    error!(visitor_id = %visitor_id, mac = %mac, error = %e, "guest authorization failed");
                } else {
                    warn!(visitor_id = %visitor_id, mac = %mac, error = %e, "guest authorization failed; device stays active locally");
                }
                (WorkflowState::DeviceActive, Some(e))
            }
        };

        info!(visitor_id = %visitor_id, mac = %mac, device_id = %device.id, %state, "visitor authorized");
        Ok(Authorization {
            visitor,
            device,
            code,
            state,
            remote_error,
        })
    }

    /// Register (or reactivate) a device for a visitor outside the code
    /// flow, subject to the quota.
    pub async fn admit_device(
        &self,
        visitor_id: VisitorId,
        raw_mac: &str,
        friendly_name: Option<String>,
    ) -> DeviceAdmissionResult {
        let mac = MacAddress::parse(raw_mac)?;
        Ok(self.quota.admit(visitor_id, &mac, friendly_name).await?)
    }

    /// Take a device offline, freeing a quota slot.
    pub async fn revoke_device(&self, device_id: DeviceId) -> DeviceAdmissionResult {
        Ok(self.quota.revoke(device_id).await?)
    }
}

// ── Verification codes ──
//
// Issue: random six-digit code bound to (visitor, IP, MAC).
// Validate: same visitor, same digits, same MAC, inside the window,
// not yet used. Codes are not globally unique; lookups are always
// scoped to the visitor.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::clock::{Clock, delta};
use crate::error::{CodeValidationError, IssuanceError, RegistryError};
use crate::model::{CodeId, MacAddress, VerificationCode, VisitorId};
use crate::store::Registry;

const CODE_SPACE: u32 = 1_000_000;

pub struct VerificationCodeService {
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl VerificationCodeService {
    pub fn new(registry: Arc<Registry>, clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            registry,
            clock,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Create and store a fresh code for the visitor's device.
    pub fn issue(
        &self,
        visitor_id: VisitorId,
        ip: IpAddr,
        mac: &MacAddress,
    ) -> Result<VerificationCode, IssuanceError> {
        let now = self.clock.now();
        let code = VerificationCode {
            id: CodeId::new(),
            visitor_id,
            code: generate(&mut rand::thread_rng()),
            ip,
            mac: mac.clone(),
            issued_at: now,
            validated_at: None,
            expires_at: now + delta(self.window),
        };

        self.registry.insert_code(code.clone()).map_err(|e| match e {
            RegistryError::VisitorNotFound(id) => IssuanceError::VisitorNotFound(id),
            _ => IssuanceError::VisitorNotFound(visitor_id),
        })?;

        info!(visitor_id = %visitor_id, mac = %mac, %ip, code_id = %code.id, "verification code issued");
        Ok(code)
    }

    /// Check a submitted code and consume it on success.
    ///
    /// Failures are checked in order: no matching code, wrong device,
    /// expired, already used.
    pub fn validate(
        &self,
        visitor_id: VisitorId,
        submitted: &str,
        requesting_mac: &MacAddress,
    ) -> Result<VerificationCode, CodeValidationError> {
        let submitted = submitted.trim();
        let now = self.clock.now();

        // Newest first, so a re-issued code shadows older ones with the same digits.
        let code = self
            .registry
            .codes_of(visitor_id)
            .into_iter()
            .find(|c| c.code == submitted)
            .ok_or(CodeValidationError::InvalidCode)?;

        if code.mac != *requesting_mac {
            warn!(visitor_id = %visitor_id, expected = %code.mac, got = %requesting_mac, "code presented from another device");
            return Err(CodeValidationError::WrongDevice);
        }
        if code.is_expired(now) {
            debug!(code_id = %code.id, "code expired");
            return Err(CodeValidationError::Expired);
        }
        if code.validated_at.is_some() {
            return Err(CodeValidationError::AlreadyUsed);
        }

        let code = self
            .registry
            .mark_code_validated(code.id, now)
            .map_err(|e| match e {
                RegistryError::CodeNotFound => CodeValidationError::InvalidCode,
                _ => CodeValidationError::AlreadyUsed,
            })?;

        info!(visitor_id = %visitor_id, mac = %requesting_mac, code_id = %code.id, "verification code validated");
        Ok(code)
    }

    /// Forget an issued code, e.g. because it never reached the visitor.
    pub fn discard(&self, code_id: CodeId) -> Option<VerificationCode> {
        let removed = self.registry.remove_code(code_id);
        if removed.is_some() {
            debug!(code_id = %code_id, "verification code discarded");
        }
        removed
    }
}

/// Uniform six-digit code, zero padded.
fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..CODE_SPACE))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::VisitorRegistration;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Fixture {
        clock: Arc<ManualClock>,
        service: VerificationCodeService,
        visitor: VisitorId,
        ip: IpAddr,
        mac: MacAddress,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(Registry::new());
        let clock = Arc::new(ManualClock::default());
        let service = VerificationCodeService::new(
            Arc::clone(&registry),
            clock.clone(),
            Duration::from_secs(600),
        );
        let visitor = registry
            .insert_visitor(
                VisitorRegistration {
                    name: "Ana".into(),
                    email: "ana@example.com".into(),
                    phone: "83988887777".into(),
                    mac: None,
                }
                .into_visitor(Utc::now())
                .unwrap(),
            )
            .id;
        Fixture {
            clock,
            service,
            visitor,
            ip: "10.0.0.5".parse().unwrap(),
            mac: MacAddress::parse("aa-bb-cc-dd-ee-ff").unwrap(),
        }
    }

    #[test]
    fn generated_codes_are_six_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let code = generate(&mut rng);
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn code_validates_once() {
        let f = fixture();
        let code = f.service.issue(f.visitor, f.ip, &f.mac).unwrap();

        let validated = f.service.validate(f.visitor, &code.code, &f.mac).unwrap();
        assert!(validated.validated_at.is_some());

        assert_eq!(
            f.service.validate(f.visitor, &code.code, &f.mac),
            Err(CodeValidationError::AlreadyUsed)
        );
    }

    #[test]
    fn code_from_other_device_is_wrong_device() {
        let f = fixture();
        let code = f.service.issue(f.visitor, f.ip, &f.mac).unwrap();
        let other = MacAddress::parse("11:22:33:44:55:66").unwrap();
        assert_eq!(
            f.service.validate(f.visitor, &code.code, &other),
            Err(CodeValidationError::WrongDevice)
        );
        // The rightful device can still use it.
        assert!(f.service.validate(f.visitor, &code.code, &f.mac).is_ok());
    }

    #[test]
    fn code_expires_after_window() {
        let f = fixture();
        let code = f.service.issue(f.visitor, f.ip, &f.mac).unwrap();
        f.clock.advance(Duration::from_secs(601));
        assert_eq!(
            f.service.validate(f.visitor, &code.code, &f.mac),
            Err(CodeValidationError::Expired)
        );
    }

    #[test]
    fn unknown_digits_are_invalid() {
        let f = fixture();
        let code = f.service.issue(f.visitor, f.ip, &f.mac).unwrap();
        let wrong = if code.code == "000000" { "000001" } else { "000000" };
        assert_eq!(
            f.service.validate(f.visitor, wrong, &f.mac),
            Err(CodeValidationError::InvalidCode)
        );
        // Another visitor's code is never found.
        assert_eq!(
            f.service.validate(VisitorId::new(), &code.code, &f.mac),
            Err(CodeValidationError::InvalidCode)
        );
    }

    #[test]
    fn discarded_code_no_longer_validates() {
        let f = fixture();
        let code = f.service.issue(f.visitor, f.ip, &f.mac).unwrap();
        assert!(f.service.discard(code.id).is_some());
        assert_eq!(
            f.service.validate(f.visitor, &code.code, &f.mac),
            Err(CodeValidationError::InvalidCode)
        );
    }

    #[test]
    fn issuing_for_unknown_visitor_fails() {
        let f = fixture();
        let err = f.service.issue(VisitorId::new(), f.ip, &f.mac).unwrap_err();
        assert!(matches!(err, IssuanceError::VisitorNotFound(_)));
    }
}

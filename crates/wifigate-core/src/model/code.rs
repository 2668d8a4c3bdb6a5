use std::net::IpAddr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::id::{CodeId, VisitorId};
use super::mac::MacAddress;

/// Lifecycle of a verification code. `Validated` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CodeState {
    Issued,
    Validated,
    Expired,
}

/// A six-digit one-time code bound to the visitor, IP and MAC that asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCode {
    pub id: CodeId,
    pub visitor_id: VisitorId,
    pub code: String,
    pub ip: IpAddr,
    pub mac: MacAddress,
    pub issued_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn state(&self, now: DateTime<Utc>) -> CodeState {
        if self.validated_at.is_some() {
            CodeState::Validated
        } else if self.is_expired(now) {
            CodeState::Expired
        } else {
            CodeState::Issued
        }
    }

    /// Whole minutes the code stays valid after issuance.
    pub fn window_minutes(&self) -> i64 {
        (self.expires_at - self.issued_at).num_minutes()
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.expires_at - now).max(TimeDelta::zero())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn code(issued_at: DateTime<Utc>) -> VerificationCode {
        VerificationCode {
            id: CodeId::new(),
            visitor_id: VisitorId::new(),
            code: "042137".into(),
            ip: "10.0.0.5".parse().unwrap(),
            mac: MacAddress::parse("aa:bb:cc:dd:ee:ff").unwrap(),
            issued_at,
            validated_at: None,
            expires_at: issued_at + TimeDelta::minutes(10),
        }
    }

    #[test]
    fn state_follows_clock_and_validation() {
        let t0 = Utc::now();
        let mut c = code(t0);
        assert_eq!(c.state(t0), CodeState::Issued);
        assert_eq!(c.state(t0 + TimeDelta::minutes(10)), CodeState::Issued);
        assert_eq!(c.state(t0 + TimeDelta::minutes(11)), CodeState::Expired);

        c.validated_at = Some(t0);
        assert_eq!(c.state(t0 + TimeDelta::minutes(11)), CodeState::Validated);
    }

    #[test]
    fn window_and_remaining() {
        let t0 = Utc::now();
        let c = code(t0);
        assert_eq!(c.window_minutes(), 10);
        assert_eq!(c.remaining(t0 + TimeDelta::minutes(4)), TimeDelta::minutes(6));
        assert_eq!(c.remaining(t0 + TimeDelta::hours(1)), TimeDelta::zero());
    }

    #[test]
    fn state_displays_snake_case() {
        assert_eq!(CodeState::Validated.to_string(), "validated");
        assert_eq!("expired".parse::<CodeState>().unwrap(), CodeState::Expired);
    }
}

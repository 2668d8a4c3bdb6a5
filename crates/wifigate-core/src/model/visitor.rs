use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{DeviceId, VisitorId};
use super::mac::MacAddress;
use crate::error::RegistrationError;

/// A person registered through the portal.
///
/// `authorized` flips to true only after one of their devices passes
/// code verification (or an operator overrides it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visitor {
    pub id: VisitorId,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Single MAC captured by older portal versions, kept for reference.
    pub legacy_mac: Option<MacAddress>,
    pub authorized: bool,
    pub registered_at: DateTime<Utc>,
}

/// A device owned by exactly one visitor.
///
/// A MAC is the active device of at most one record system-wide, and a
/// visitor holds at most `device_quota` active devices at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorDevice {
    pub id: DeviceId,
    pub visitor_id: VisitorId,
    pub mac: MacAddress,
    pub friendly_name: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Raw portal form submission, validated into a [`Visitor`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitorRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub mac: Option<String>,
}

impl VisitorRegistration {
    /// Check required fields and build the record.
    pub fn into_visitor(self, now: DateTime<Utc>) -> Result<Visitor, RegistrationError> {
        let name = required("name", self.name)?;
        let email = required("email", self.email)?;
        let phone = required("phone", self.phone)?;

        if !email.contains('@') {
            return Err(RegistrationError::InvalidEmail { email });
        }

        let legacy_mac = self
            .mac
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(MacAddress::parse)
            .transpose()?;

        Ok(Visitor {
            id: VisitorId::new(),
            name,
            email,
            phone,
            legacy_mac,
            authorized: false,
            registered_at: now,
        })
    }
}

fn required(field: &'static str, value: String) -> Result<String, RegistrationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RegistrationError::MissingField { field })
    } else {
        Ok(trimmed.to_owned())
    }
}

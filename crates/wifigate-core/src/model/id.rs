// ── Record identifiers ──
//
// Every stored record gets a random UUID. Distinct newtypes keep a
// device id from being passed where a visitor id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }
    };
}

record_id!(
    /// Identifies a [`Visitor`](super::Visitor).
    VisitorId
);
record_id!(
    /// Identifies a [`VisitorDevice`](super::VisitorDevice).
    DeviceId
);
record_id!(
    /// Identifies a [`VerificationCode`](super::VerificationCode).
    CodeId
);
record_id!(
    /// Identifies a [`StaffDevice`](super::StaffDevice).
    StaffDeviceId
);

// ── Domain model ──
//
// Plain records owned by the registry. Canonical MAC handling lives in
// `mac`; everything else is data with small helpers.

pub mod code;
pub mod id;
pub mod mac;
pub mod staff;
pub mod visitor;

pub use code::{CodeState, VerificationCode};
pub use id::{CodeId, DeviceId, StaffDeviceId, VisitorId};
pub use mac::{MacAddress, MacParseError};
pub use staff::{StaffDevice, StaffRegistration};
pub use visitor::{Visitor, VisitorDevice, VisitorRegistration};

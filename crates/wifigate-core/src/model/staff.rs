use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::StaffDeviceId;
use super::mac::MacAddress;

/// A staff member's device, allow-listed on the staff SSID.
///
/// No quota applies. The MAC is unique among staff devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffDevice {
    pub id: StaffDeviceId,
    pub owner: String,
    pub registration_number: String,
    pub device_name: String,
    pub mac: MacAddress,
    pub created_at: DateTime<Utc>,
}

/// Fields an operator supplies when adding a staff device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRegistration {
    pub owner: String,
    pub registration_number: String,
    pub device_name: String,
    pub mac: MacAddress,
}

// ── In-process registry ──
//
// The persistence boundary: owns visitors, devices, codes and staff
// devices, enforces the device invariants on every write, and notifies
// registered lifecycle hooks after each commit. Hooks run after the
// write lock is released, so a slow or failing hook never undoes or
// blocks the local change.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::collection::Collection;
use crate::error::RegistryError;
use crate::model::{
    CodeId, DeviceId, MacAddress, StaffDevice, StaffDeviceId, StaffRegistration,
    VerificationCode, Visitor, VisitorDevice, VisitorId,
};

// ── Lifecycle hooks ──────────────────────────────────────────────────

/// Change notifications fired after a committed write, whichever code
/// path made it. Every method defaults to a no-op.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// A device was created active or went from inactive to active.
    async fn on_device_activated(&self, _device: &VisitorDevice) {}

    /// A device went from active to inactive.
    async fn on_device_deactivated(&self, _device: &VisitorDevice) {}

    /// A device record was deleted (it may have been inactive).
    async fn on_device_deleted(&self, _device: &VisitorDevice) {}

    /// A visitor was deleted together with all their devices.
    async fn on_visitor_deleted(&self, _visitor: &Visitor, _devices: &[VisitorDevice]) {}

    async fn on_staff_device_added(&self, _device: &StaffDevice) {}

    async fn on_staff_device_removed(&self, _device: &StaffDevice) {}
}

/// A committed change, queued for hook dispatch.
#[derive(Debug, Clone)]
pub(crate) enum LifecycleEvent {
    DeviceActivated(VisitorDevice),
    DeviceDeactivated(VisitorDevice),
    DeviceDeleted(VisitorDevice),
    VisitorDeleted {
        visitor: Visitor,
        devices: Vec<VisitorDevice>,
    },
    StaffDeviceAdded(StaffDevice),
    StaffDeviceRemoved(StaffDevice),
}

// ── Registry ─────────────────────────────────────────────────────────

pub struct Registry {
    visitors: Collection<VisitorId, Visitor>,
    devices: Collection<DeviceId, VisitorDevice>,
    codes: Collection<CodeId, VerificationCode>,
    staff: Collection<StaffDeviceId, StaffDevice>,
    /// Serializes check-then-write sequences so invariants hold under
    /// concurrent writers. Never held across an await.
    commit: Mutex<()>,
    hooks: RwLock<Vec<Arc<dyn LifecycleHooks>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            visitors: Collection::new(),
            devices: Collection::new(),
            codes: Collection::new(),
            staff: Collection::new(),
            commit: Mutex::new(()),
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register a hook to be told about every committed change.
    pub fn register_hooks(&self, hooks: Arc<dyn LifecycleHooks>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hooks);
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Visitors ─────────────────────────────────────────────────────

    pub fn insert_visitor(&self, visitor: Visitor) -> Visitor {
        let _guard = self.lock();
        info!(visitor_id = %visitor.id, email = %visitor.email, "visitor registered");
        self.visitors.upsert(visitor.id, visitor.clone());
        visitor
    }

    pub fn visitor(&self, id: VisitorId) -> Option<Visitor> {
        self.visitors.get(&id).map(|v| Visitor::clone(&v))
    }

    pub fn visitors(&self) -> Vec<Visitor> {
        self.visitors.all()
    }

    pub fn visitor_by_email(&self, email: &str) -> Option<Visitor> {
        self.visitors.find(|v| v.email.eq_ignore_ascii_case(email))
    }

    pub fn set_visitor_authorized(
        &self,
        id: VisitorId,
        authorized: bool,
    ) -> Result<Visitor, RegistryError> {
        let _guard = self.lock();
        let mut visitor = self
            .visitor(id)
            .ok_or(RegistryError::VisitorNotFound(id))?;
        if visitor.authorized != authorized {
            visitor.authorized = authorized;
            self.visitors.upsert(id, visitor.clone());
            info!(visitor_id = %id, authorized, "visitor authorization changed");
        }
        Ok(visitor)
    }

    /// Delete a visitor, cascading to their devices and codes.
    pub async fn delete_visitor(&self, id: VisitorId) -> Result<Visitor, RegistryError> {
        let (visitor, devices) = {
            let _guard = self.lock();
            let visitor = self
                .visitors
                .remove(&id)
                .ok_or(RegistryError::VisitorNotFound(id))?;

            let devices = self.devices.filter(|d| d.visitor_id == id);
            for device in &devices {
                self.devices.remove(&device.id);
            }
            for code in self.codes.filter(|c| c.visitor_id == id) {
                self.codes.remove(&code.id);
            }
            (Visitor::clone(&visitor), devices)
        };

        info!(visitor_id = %id, devices = devices.len(), "visitor deleted");
        self.dispatch(LifecycleEvent::VisitorDeleted {
            visitor: visitor.clone(),
            devices,
        })
        .await;
        Ok(visitor)
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub fn device(&self, id: DeviceId) -> Option<VisitorDevice> {
        self.devices.get(&id).map(|d| VisitorDevice::clone(&d))
    }

    pub fn devices_of(&self, visitor_id: VisitorId) -> Vec<VisitorDevice> {
        let mut devices = self.devices.filter(|d| d.visitor_id == visitor_id);
        devices.sort_by_key(|d| d.created_at);
        devices
    }

    pub fn active_devices(&self) -> Vec<VisitorDevice> {
        self.devices.filter(|d| d.active)
    }

    /// Canonical MACs of every active visitor device.
    pub fn active_macs(&self) -> BTreeSet<MacAddress> {
        self.active_devices().into_iter().map(|d| d.mac).collect()
    }

    pub fn active_device_by_mac(&self, mac: &MacAddress) -> Option<VisitorDevice> {
        self.devices.find(|d| d.active && d.mac == *mac)
    }

    /// The visitor's device with this MAC, active or not.
    pub fn device_of_visitor_by_mac(
        &self,
        visitor_id: VisitorId,
        mac: &MacAddress,
    ) -> Option<VisitorDevice> {
        self.devices
            .find(|d| d.visitor_id == visitor_id && d.mac == *mac)
    }

    /// Active devices of a visitor, optionally ignoring one device.
    pub fn active_device_count(&self, visitor_id: VisitorId, excluding: Option<DeviceId>) -> usize {
        self.devices
            .filter(|d| d.visitor_id == visitor_id && d.active && Some(d.id) != excluding)
            .len()
    }

    /// Write a device record, enforcing MAC uniqueness among active
    /// devices and the per-visitor active quota.
    ///
    /// Returns the event to dispatch, if the active flag changed.
    pub(crate) fn commit_device(
        &self,
        device: VisitorDevice,
        quota: usize,
    ) -> Result<Option<LifecycleEvent>, RegistryError> {
        let _guard = self.lock();

        if self.visitors.get(&device.visitor_id).is_none() {
            return Err(RegistryError::VisitorNotFound(device.visitor_id));
        }

        if device.active {
            if self
                .devices
                .find(|d| d.active && d.mac == device.mac && d.id != device.id)
                .is_some()
            {
                return Err(RegistryError::DuplicateActiveMac { mac: device.mac });
            }
            if self.active_device_count(device.visitor_id, Some(device.id)) >= quota {
                return Err(RegistryError::QuotaExceeded {
                    visitor_id: device.visitor_id,
                    quota,
                });
            }
        }

        let was_active = self.devices.get(&device.id).is_some_and(|d| d.active);
        self.devices.upsert(device.id, device.clone());

        let event = match (was_active, device.active) {
            (false, true) => {
                info!(device_id = %device.id, mac = %device.mac, visitor_id = %device.visitor_id, "device activated");
                Some(LifecycleEvent::DeviceActivated(device))
            }
            (true, false) => {
                info!(device_id = %device.id, mac = %device.mac, visitor_id = %device.visitor_id, "device deactivated");
                Some(LifecycleEvent::DeviceDeactivated(device))
            }
            _ => None,
        };
        Ok(event)
    }

    /// Delete a device record outright.
    pub async fn delete_device(&self, id: DeviceId) -> Result<VisitorDevice, RegistryError> {
        let device = {
            let _guard = self.lock();
            let removed = self
                .devices
                .remove(&id)
                .ok_or(RegistryError::DeviceNotFound(id))?;
            VisitorDevice::clone(&removed)
        };
        info!(device_id = %id, mac = %device.mac, "device deleted");
        self.dispatch(LifecycleEvent::DeviceDeleted(device.clone()))
            .await;
        Ok(device)
    }

    // ── Verification codes ───────────────────────────────────────────

    pub(crate) fn insert_code(&self, code: VerificationCode) -> Result<(), RegistryError> {
        let _guard = self.lock();
        if self.visitors.get(&code.visitor_id).is_none() {
            return Err(RegistryError::VisitorNotFound(code.visitor_id));
        }
        self.codes.upsert(code.id, code);
        Ok(())
    }

    pub fn code(&self, id: CodeId) -> Option<VerificationCode> {
        self.codes.get(&id).map(|c| VerificationCode::clone(&c))
    }

    /// Codes issued to a visitor, newest first.
    pub fn codes_of(&self, visitor_id: VisitorId) -> Vec<VerificationCode> {
        let mut codes = self.codes.filter(|c| c.visitor_id == visitor_id);
        codes.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        codes
    }

    /// Stamp a code as consumed. Fails if someone else got there first.
    pub(crate) fn mark_code_validated(
        &self,
        id: CodeId,
        at: DateTime<Utc>,
    ) -> Result<VerificationCode, RegistryError> {
        let _guard = self.lock();
        let mut code = self.code(id).ok_or(RegistryError::CodeNotFound)?;
        if code.validated_at.is_some() {
            return Err(RegistryError::CodeAlreadyValidated);
        }
        code.validated_at = Some(at);
        self.codes.upsert(id, code.clone());
        Ok(code)
    }

    pub(crate) fn remove_code(&self, id: CodeId) -> Option<VerificationCode> {
        let _guard = self.lock();
        self.codes.remove(&id).map(|c| VerificationCode::clone(&c))
    }

    // ── Staff devices ────────────────────────────────────────────────

    pub fn staff_devices(&self) -> Vec<StaffDevice> {
        let mut devices = self.staff.all();
        devices.sort_by_key(|d| d.created_at);
        devices
    }

    pub fn staff_macs(&self) -> BTreeSet<MacAddress> {
        self.staff.all().into_iter().map(|d| d.mac).collect()
    }

    pub async fn add_staff_device(
        &self,
        registration: StaffRegistration,
        now: DateTime<Utc>,
    ) -> Result<StaffDevice, RegistryError> {
        let device = {
            let _guard = self.lock();
            if self.staff.find(|d| d.mac == registration.mac).is_some() {
                return Err(RegistryError::DuplicateStaffMac {
                    mac: registration.mac,
                });
            }
            let device = StaffDevice {
                id: StaffDeviceId::new(),
                owner: registration.owner,
                registration_number: registration.registration_number,
                device_name: registration.device_name,
                mac: registration.mac,
                created_at: now,
            };
            self.staff.upsert(device.id, device.clone());
            device
        };
        info!(staff_device_id = %device.id, mac = %device.mac, owner = %device.owner, "staff device added");
        self.dispatch(LifecycleEvent::StaffDeviceAdded(device.clone()))
            .await;
        Ok(device)
    }

    pub async fn remove_staff_device(
        &self,
        id: StaffDeviceId,
    ) -> Result<StaffDevice, RegistryError> {
        let device = {
            let _guard = self.lock();
            let removed = self
                .staff
                .remove(&id)
                .ok_or(RegistryError::StaffDeviceNotFound(id))?;
            StaffDevice::clone(&removed)
        };
        info!(staff_device_id = %id, mac = %device.mac, "staff device removed");
        self.dispatch(LifecycleEvent::StaffDeviceRemoved(device.clone()))
            .await;
        Ok(device)
    }

    // ── Hook dispatch ────────────────────────────────────────────────

    pub(crate) async fn dispatch(&self, event: LifecycleEvent) {
        let hooks: Vec<Arc<dyn LifecycleHooks>> = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        debug!(hooks = hooks.len(), ?event, "dispatching lifecycle event");

        for hook in hooks {
            match &event {
                LifecycleEvent::DeviceActivated(d) => hook.on_device_activated(d).await,
                LifecycleEvent::DeviceDeactivated(d) => hook.on_device_deactivated(d).await,
                LifecycleEvent::DeviceDeleted(d) => hook.on_device_deleted(d).await,
                LifecycleEvent::VisitorDeleted { visitor, devices } => {
                    hook.on_visitor_deleted(visitor, devices).await;
                }
                LifecycleEvent::StaffDeviceAdded(d) => hook.on_staff_device_added(d).await,
                LifecycleEvent::StaffDeviceRemoved(d) => hook.on_staff_device_removed(d).await,
            }
        }
    }
}

// ── Device quota policy ──
//
// Decides whether a visitor may bring another device online. The
// registry enforces the same limits on commit; this layer picks between
// reactivating, creating and rejecting, and serializes those decisions
// so two concurrent admits for one visitor cannot both pass the count.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::AdmissionError;
use crate::model::{DeviceId, MacAddress, VisitorDevice, VisitorId};
use crate::store::{LifecycleEvent, Registry};

pub struct DeviceQuotaPolicy {
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    quota: usize,
    admission: Mutex<()>,
}

impl DeviceQuotaPolicy {
    pub fn new(registry: Arc<Registry>, clock: Arc<dyn Clock>, quota: usize) -> Self {
        Self {
            registry,
            clock,
            quota,
            admission: Mutex::new(()),
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    /// True iff the visitor has fewer than `quota` active devices, not
    /// counting `excluding` (so a device can be reactivated in place).
    pub fn can_activate(&self, visitor_id: VisitorId, excluding: Option<DeviceId>) -> bool {
        self.registry.active_device_count(visitor_id, excluding) < self.quota
    }

    /// Bring a device online for a visitor.
    ///
    /// - already active for this visitor: returned as is
    /// - active for another visitor: `DuplicateActiveMac`
    /// - inactive for this visitor: reactivated, quota permitting
    /// - unknown: created active, quota permitting
    pub async fn admit(
        &self,
        visitor_id: VisitorId,
        mac: &MacAddress,
        friendly_name: Option<String>,
    ) -> Result<VisitorDevice, AdmissionError> {
        let (device, event) = {
            let _admission = self.admission.lock().await;

            if self.registry.visitor(visitor_id).is_none() {
                return Err(AdmissionError::VisitorNotFound(visitor_id));
            }

            if let Some(active) = self.registry.active_device_by_mac(mac) {
                if active.visitor_id == visitor_id {
                    debug!(device_id = %active.id, mac = %mac, "device already active");
                    return Ok(active);
                }
                return Err(AdmissionError::DuplicateActiveMac { mac: mac.clone() });
            }

            let now = self.clock.now();
            let device = match self.registry.device_of_visitor_by_mac(visitor_id, mac) {
                Some(mut existing) => {
                    self.check_quota(visitor_id, Some(existing.id))?;
                    existing.active = true;
                    existing.last_seen = now;
                    if friendly_name.is_some() {
                        existing.friendly_name = friendly_name;
                    }
                    existing
                }
                None => {
                    self.check_quota(visitor_id, None)?;
                    VisitorDevice {
                        id: DeviceId::new(),
                        visitor_id,
                        mac: mac.clone(),
                        friendly_name,
                        active: true,
                        created_at: now,
                        last_seen: now,
                    }
                }
            };

            let event = self.registry.commit_device(device.clone(), self.quota)?;
            (device, event)
        };

        info!(device_id = %device.id, mac = %device.mac, visitor_id = %visitor_id, "device admitted");
        self.notify(event).await;
        Ok(device)
    }

    /// Activate an existing device (operator action), quota permitting.
    pub async fn activate(&self, device_id: DeviceId) -> Result<VisitorDevice, AdmissionError> {
        let (device, event) = {
            let _admission = self.admission.lock().await;
            let mut device = self
                .registry
                .device(device_id)
                .ok_or(AdmissionError::DeviceNotFound(device_id))?;
            if device.active {
                return Ok(device);
            }
            self.check_quota(device.visitor_id, Some(device.id))?;
            device.active = true;
            device.last_seen = self.clock.now();
            let event = self.registry.commit_device(device.clone(), self.quota)?;
            (device, event)
        };
        self.notify(event).await;
        Ok(device)
    }

    /// Take a device offline. The record is kept for history.
    pub async fn revoke(&self, device_id: DeviceId) -> Result<VisitorDevice, AdmissionError> {
        let (device, event) = {
            let _admission = self.admission.lock().await;
            let mut device = self
                .registry
                .device(device_id)
                .ok_or(AdmissionError::DeviceNotFound(device_id))?;
            device.active = false;
            let event = self.registry.commit_device(device.clone(), self.quota)?;
            (device, event)
        };
        info!(device_id = %device.id, mac = %device.mac, "device revoked");
        self.notify(event).await;
        Ok(device)
    }

    fn check_quota(
        &self,
        visitor_id: VisitorId,
        excluding: Option<DeviceId>,
    ) -> Result<(), AdmissionError> {
        if self.can_activate(visitor_id, excluding) {
            Ok(())
        } else {
            debug!(visitor_id = %visitor_id, quota = self.quota, "device quota reached");
            Err(AdmissionError::QuotaExceeded {
                visitor_id,
                quota: self.quota,
            })
        }
    }

    async fn notify(&self, event: Option<LifecycleEvent>) {
        if let Some(event) = event {
            self.registry.dispatch(event).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{Visitor, VisitorRegistration};
    use chrono::Utc;

    fn setup() -> (Arc<Registry>, DeviceQuotaPolicy, Visitor) {
        let registry = Arc::new(Registry::new());
        let clock = Arc::new(ManualClock::default());
        let policy = DeviceQuotaPolicy::new(Arc::clone(&registry), clock, 3);
        let visitor = registry.insert_visitor(
            VisitorRegistration {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                phone: "83988887777".into(),
                mac: None,
            }
            .into_visitor(Utc::now())
            .unwrap(),
        );
        (registry, policy, visitor)
    }

    fn mac(n: u8) -> MacAddress {
        MacAddress::parse(&format!("AA:BB:CC:DD:EE:{n:02X}")).unwrap()
    }

    #[tokio::test]
    async fn fourth_device_is_rejected_until_one_is_revoked() {
        let (registry, policy, ana) = setup();
        let mut admitted = Vec::new();
        for n in 1..=3 {
            admitted.push(policy.admit(ana.id, &mac(n), None).await.unwrap());
        }

        let err = policy.admit(ana.id, &mac(4), None).await.unwrap_err();
        assert!(matches!(err, AdmissionError::QuotaExceeded { quota: 3, .. }));
        assert!(!policy.can_activate(ana.id, None));

        policy.revoke(admitted[0].id).await.unwrap();
        policy.admit(ana.id, &mac(4), None).await.unwrap();
        assert_eq!(registry.active_device_count(ana.id, None), 3);
        // Revoked devices stay on record.
        assert_eq!(registry.devices_of(ana.id).len(), 4);
    }

    #[tokio::test]
    async fn admitting_same_mac_twice_is_idempotent() {
        let (registry, policy, ana) = setup();
        let first = policy.admit(ana.id, &mac(1), Some("phone".into())).await.unwrap();
        let second = policy.admit(ana.id, &mac(1), None).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(registry.devices_of(ana.id).len(), 1);
    }

    #[tokio::test]
    async fn inactive_device_is_reactivated_in_place() {
        let (registry, policy, ana) = setup();
        let device = policy.admit(ana.id, &mac(1), None).await.unwrap();
        policy.revoke(device.id).await.unwrap();

        let again = policy.admit(ana.id, &mac(1), Some("laptop".into())).await.unwrap();
        assert_eq!(again.id, device.id);
        assert!(again.active);
        assert_eq!(again.friendly_name.as_deref(), Some("laptop"));
        assert_eq!(registry.devices_of(ana.id).len(), 1);
    }

    #[tokio::test]
    async fn mac_active_for_other_visitor_is_a_duplicate() {
        let (registry, policy, ana) = setup();
        let bia = registry.insert_visitor(Visitor {
            id: VisitorId::new(),
            email: "bia@example.com".into(),
            ..ana.clone()
        });
        policy.admit(ana.id, &mac(1), None).await.unwrap();
        let err = policy.admit(bia.id, &mac(1), None).await.unwrap_err();
        assert!(matches!(err, AdmissionError::DuplicateActiveMac { .. }));
    }

    #[tokio::test]
    async fn can_activate_excludes_the_device_in_question() {
        let (_registry, policy, ana) = setup();
        let mut last = None;
        for n in 1..=3 {
            last = Some(policy.admit(ana.id, &mac(n), None).await.unwrap());
        }
        let last = last.unwrap();
        assert!(!policy.can_activate(ana.id, None));
        assert!(policy.can_activate(ana.id, Some(last.id)));
    }

    #[tokio::test]
    async fn active_count_never_exceeds_quota_under_concurrency() {
        let (registry, policy, ana) = setup();
        let policy = Arc::new(policy);
        let mut handles = Vec::new();
        for n in 1..=10 {
            let policy = Arc::clone(&policy);
            handles.push(tokio::spawn(async move {
                policy.admit(ana.id, &mac(n), None).await
            }));
        }
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 3);
        assert_eq!(registry.active_device_count(ana.id, None), 3);
    }

    #[tokio::test]
    async fn unknown_visitor_is_rejected() {
        let (_registry, policy, _ana) = setup();
        let err = policy.admit(VisitorId::new(), &mac(1), None).await.unwrap_err();
        assert!(matches!(err, AdmissionError::VisitorNotFound(_)));
    }
}

// ── Allow-list reconciliation ──
//
// Lifecycle events become at most one allow-list mutation each. Remote
// failures are logged and swallowed here: the local change that caused
// the event is already committed, and `bulk_sync` is the recovery path.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::config::PortalConfig;
use crate::controller::ControllerClient;
use crate::error::{ControllerError, SyncError};
use crate::model::{MacAddress, StaffDevice, Visitor, VisitorDevice};
use crate::store::{LifecycleHooks, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
enum Mutation {
    Add,
    Remove,
}

/// Outcome of converging one SSID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub ssid: String,
    /// Size of the desired MAC set.
    pub desired: usize,
    /// MACs that were missing remotely.
    pub added: usize,
    /// MACs that were present remotely but not desired.
    pub removed: usize,
    /// Replace-list calls sent (0, 1 or 2).
    pub writes: usize,
}

pub struct SyncReconciler {
    controller: Arc<ControllerClient>,
    registry: Arc<Registry>,
    visitor_ssid: String,
    staff_ssid: Option<String>,
}

impl SyncReconciler {
    pub fn new(controller: Arc<ControllerClient>, registry: Arc<Registry>, config: &PortalConfig) -> Self {
        Self {
            controller,
            registry,
            visitor_ssid: config.visitor_ssid.clone(),
            staff_ssid: config.staff_ssid.clone(),
        }
    }

    /// MACs that should be on `ssid` according to local state.
    pub fn desired_set(&self, ssid: &str) -> Result<BTreeSet<MacAddress>, SyncError> {
        if ssid == self.visitor_ssid {
            Ok(self.registry.active_macs())
        } else if self.staff_ssid.as_deref() == Some(ssid) {
            Ok(self.registry.staff_macs())
        } else {
            Err(SyncError::Unmanaged {
                ssid: ssid.to_owned(),
            })
        }
    }

    /// Converge a managed SSID to local state.
    ///
    /// Idempotent: with no local change in between, a second run sends
    /// no writes.
    pub async fn bulk_sync(&self, ssid: &str) -> Result<SyncReport, SyncError> {
        let desired = self.desired_set(ssid)?;
        Ok(self.converge(ssid, &desired).await?)
    }

    /// Converge `ssid` to exactly `desired`: one union call for missing
    /// MACs, one difference call for extra ones, each only if needed.
    pub async fn converge(
        &self,
        ssid: &str,
        desired: &BTreeSet<MacAddress>,
    ) -> Result<SyncReport, ControllerError> {
        let result = self.converge_inner(ssid, desired).await;
        self.controller.metrics().record_bulk(result.is_ok());
        match &result {
            Ok(report) => info!(
                ssid,
                desired = report.desired,
                added = report.added,
                removed = report.removed,
                writes = report.writes,
                "allow-list reconciled"
            ),
            Err(e) => warn!(ssid, error = %e, "allow-list reconciliation failed"),
        }
        result
    }

    async fn converge_inner(
        &self,
        ssid: &str,
        desired: &BTreeSet<MacAddress>,
    ) -> Result<SyncReport, ControllerError> {
        let current = self.controller.get_allow_list(ssid).await?;
        let missing: BTreeSet<MacAddress> = desired.difference(&current).cloned().collect();
        let extra: BTreeSet<MacAddress> = current.difference(desired).cloned().collect();

        let mut writes = 0;
        if !missing.is_empty() && self.controller.add_to_allow_list(ssid, &missing).await?.wrote() {
            writes += 1;
        }
        if !extra.is_empty()
            && self
                .controller
                .remove_from_allow_list(ssid, &extra)
                .await?
                .wrote()
        {
            writes += 1;
        }

        Ok(SyncReport {
            ssid: ssid.to_owned(),
            desired: desired.len(),
            added: missing.len(),
            removed: extra.len(),
            writes,
        })
    }

    async fn apply(&self, ssid: &str, mac: &MacAddress, mutation: Mutation) {
        let macs = BTreeSet::from([mac.clone()]);
        let result = match mutation {
            Mutation::Add => self.controller.add_to_allow_list(ssid, &macs).await,
            Mutation::Remove => self.controller.remove_from_allow_list(ssid, &macs).await,
        };

        match result {
            Ok(change) => debug!(ssid, mac = %mac, %mutation, ?change, "allow-list updated"),
            Err(e) if e.is_configuration() => {
                error!(ssid, mac = %mac, %mutation, error = %e, "allow-list update failed");
            }
            Err(e) => {
                warn!(ssid, mac = %mac, %mutation, error = %e, "allow-list update failed; local state kept until next bulk sync");
            }
        }
    }

    async fn apply_staff(&self, device: &StaffDevice, mutation: Mutation) {
        match &self.staff_ssid {
            Some(ssid) => self.apply(ssid, &device.mac, mutation).await,
            None => debug!(mac = %device.mac, "no staff SSID configured; skipping allow-list update"),
        }
    }
}

#[async_trait]
impl LifecycleHooks for SyncReconciler {
    async fn on_device_activated(&self, device: &VisitorDevice) {
        self.apply(&self.visitor_ssid, &device.mac, Mutation::Add)
            .await;
    }

    async fn on_device_deactivated(&self, device: &VisitorDevice) {
        self.apply(&self.visitor_ssid, &device.mac, Mutation::Remove)
            .await;
    }

    async fn on_device_deleted(&self, device: &VisitorDevice) {
        self.apply(&self.visitor_ssid, &device.mac, Mutation::Remove)
            .await;
    }

    async fn on_visitor_deleted(&self, visitor: &Visitor, devices: &[VisitorDevice]) {
        debug!(visitor_id = %visitor.id, devices = devices.len(), "removing deleted visitor's devices");
        for device in devices.iter().filter(|d| d.active) {
            self.apply(&self.visitor_ssid, &device.mac, Mutation::Remove)
                .await;
        }
    }

    async fn on_staff_device_added(&self, device: &StaffDevice) {
        self.apply_staff(device, Mutation::Add).await;
    }

    async fn on_staff_device_removed(&self, device: &StaffDevice) {
        self.apply_staff(device, Mutation::Remove).await;
    }
}

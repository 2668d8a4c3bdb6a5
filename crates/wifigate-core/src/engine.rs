// ── Engine facade ──
//
// Wires registry, controller client, reconciler, quota policy, code
// service and workflow together from one `PortalConfig`. Each engine is
// independent, so tests can run several side by side.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::PortalConfig;
use crate::controller::{ControllerClient, MetricsSnapshot, SyncMetrics};
use crate::error::{RegistryError, ScheduleError, SyncError};
use crate::mail::Mailer;
use crate::model::{StaffDevice, StaffDeviceId, StaffRegistration};
use crate::quota::DeviceQuotaPolicy;
use crate::scheduler::ReconcileScheduler;
use crate::store::Registry;
use crate::sync::{SyncReconciler, SyncReport};
use crate::verification::VerificationCodeService;
use crate::workflow::AuthorizationWorkflow;

/// Cheaply cloneable handle to one portal instance.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: PortalConfig,
    clock: Arc<dyn Clock>,
    registry: Arc<Registry>,
    controller: Arc<ControllerClient>,
    reconciler: Arc<SyncReconciler>,
    quota: Arc<DeviceQuotaPolicy>,
    codes: Arc<VerificationCodeService>,
    workflow: AuthorizationWorkflow,
}

impl Engine {
    pub fn new(config: PortalConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self::with_clock(config, mailer, Arc::new(SystemClock))
    }

    /// Build an engine on an explicit time source.
    pub fn with_clock(config: PortalConfig, mailer: Arc<dyn Mailer>, clock: Arc<dyn Clock>) -> Self {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(SyncMetrics::new());
        let controller = Arc::new(ControllerClient::new(&config, Arc::clone(&clock), metrics));

        let reconciler = Arc::new(SyncReconciler::new(
            Arc::clone(&controller),
            Arc::clone(&registry),
            &config,
        ));
        registry.register_hooks(Arc::<SyncReconciler>::clone(&reconciler));

        let quota = Arc::new(DeviceQuotaPolicy::new(
            Arc::clone(&registry),
            Arc::clone(&clock),
            config.device_quota,
        ));
        let codes = Arc::new(VerificationCodeService::new(
            Arc::clone(&registry),
            Arc::clone(&clock),
            config.code_window,
        ));
        let workflow = AuthorizationWorkflow::new(
            Arc::clone(&registry),
            Arc::clone(&clock),
            Arc::clone(&quota),
            Arc::clone(&codes),
            Arc::clone(&controller),
            mailer,
            config.guest_minutes,
        );

        debug!(url = %config.url, site = %config.site, visitor_ssid = %config.visitor_ssid, "engine built");
        Self {
            inner: Arc::new(EngineInner {
                config,
                clock,
                registry,
                controller,
                reconciler,
                quota,
                codes,
                workflow,
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn controller(&self) -> &Arc<ControllerClient> {
        &self.inner.controller
    }

    pub fn reconciler(&self) -> &Arc<SyncReconciler> {
        &self.inner.reconciler
    }

    pub fn quota(&self) -> &Arc<DeviceQuotaPolicy> {
        &self.inner.quota
    }

    pub fn codes(&self) -> &Arc<VerificationCodeService> {
        &self.inner.codes
    }

    pub fn workflow(&self) -> &AuthorizationWorkflow {
        &self.inner.workflow
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.controller.metrics().snapshot()
    }

    // ── Operations ───────────────────────────────────────────────────

    pub async fn bulk_sync(&self, ssid: &str) -> Result<SyncReport, SyncError> {
        self.inner.reconciler.bulk_sync(ssid).await
    }

    /// Reconcile every managed SSID, visitor first. One SSID failing does
    /// not stop the others.
    pub async fn sync_all(&self) -> Vec<(String, Result<SyncReport, SyncError>)> {
        let mut results = Vec::new();
        for ssid in self.inner.config.managed_ssids() {
            let result = self.inner.reconciler.bulk_sync(&ssid).await;
            results.push((ssid, result));
        }
        results
    }

    /// Start periodic reconciliation of every managed SSID.
    pub fn start_scheduler(&self, every: Duration) -> Result<ReconcileScheduler, ScheduleError> {
        ReconcileScheduler::start(
            Arc::clone(&self.inner.reconciler),
            self.inner.config.managed_ssids(),
            every,
        )
    }

    pub async fn add_staff_device(
        &self,
        registration: StaffRegistration,
    ) -> Result<StaffDevice, RegistryError> {
        self.inner
            .registry
            .add_staff_device(registration, self.inner.clock.now())
            .await
    }

    pub async fn remove_staff_device(&self, id: StaffDeviceId) -> Result<StaffDevice, RegistryError> {
        self.inner.registry.remove_staff_device(id).await
    }

    /// End the controller session.
    pub async fn shutdown(&self) {
        self.inner.controller.logout().await;
        info!("engine shut down");
    }
}

//! Device authorization and allow-list synchronization for UniFi captive
//! portals.
//!
//! Sits between a portal front end and `wifigate-api`:
//!
//! - **[`Engine`]**: Facade built from one [`PortalConfig`]. Wires the
//!   registry, controller client, reconciler and workflow together and
//!   registers the reconciler as a lifecycle hook.
//!
//! - **[`AuthorizationWorkflow`]**: Registration → verification code →
//!   device admission → guest authorization, with every failure mapped to
//!   a [`Rejection`] carrying a user-facing reason.
//!
//! - **[`Registry`]**: In-process persistence boundary. Enforces the
//!   one-active-device-per-MAC and per-visitor quota invariants on every
//!   write and notifies [`LifecycleHooks`] after each commit.
//!
//! - **[`ControllerClient`]**: Session-managing wrapper around the
//!   controller's legacy API with a TTL cache of each SSID's MAC filter
//!   list. Mutations that the cached list already satisfies send nothing.
//!
//! - **[`SyncReconciler`]**: Turns lifecycle events into allow-list
//!   mutations and converges whole SSIDs with `bulk_sync`. Remote
//!   failures never roll back local state.

pub mod clock;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod mail;
pub mod model;
pub mod quota;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod verification;
pub mod workflow;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PortalConfig, TlsVerification};
pub use controller::{AllowListChange, ControllerClient, GuestStatus, MetricsSnapshot};
pub use engine::Engine;
pub use error::{
    AdmissionError, CodeValidationError, ControllerError, IssuanceError, MailError,
    RegistrationError, RegistryError, RejectReason, Rejection, ScheduleError, SyncError,
};
pub use mail::{LogMailer, Mailer, OutgoingMail};
pub use quota::DeviceQuotaPolicy;
pub use scheduler::ReconcileScheduler;
pub use store::{LifecycleHooks, Registry};
pub use sync::{SyncReconciler, SyncReport};
pub use verification::VerificationCodeService;
pub use workflow::{
    Authorization, AuthorizationWorkflow, CodeIssuanceResult, DeviceAdmissionResult,
    ValidationResult, WorkflowState,
};

pub use model::{
    CodeId, CodeState, DeviceId, MacAddress, MacParseError, StaffDevice, StaffDeviceId,
    StaffRegistration, VerificationCode, Visitor, VisitorDevice, VisitorId, VisitorRegistration,
};

// Platform selection is part of the config surface.
pub use wifigate_api::ControllerPlatform;

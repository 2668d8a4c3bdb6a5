// ── Local state ──

mod collection;
pub mod registry;

pub use registry::{LifecycleHooks, Registry};
pub(crate) use registry::LifecycleEvent;

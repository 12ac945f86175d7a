//! Host-level orchestration.
//!
//! Each configured host becomes a [`HostWorker`]; the [`FleetScheduler`]
//! admits them under a global [`ThreadBudget`].

pub mod scheduler;
pub mod worker;

pub use scheduler::{FleetScheduler, FleetSummary, ThreadBudget, DEFAULT_POLL_INTERVAL, SCHEDULER_COST};
pub use worker::{HostSpec, HostWorker};

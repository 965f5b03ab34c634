//! # Lifecycle manager
//!
//! Turns platform phase reports into capture and restore cycles over the
//! registered state-aware observers, persisting composite mementos through a
//! [`MementoRepository`](crate::repository::MementoRepository).

pub mod manager;
pub mod report;

pub use manager::{LifecycleManager, ManagerStatus};
pub use report::{CycleReport, RestoreOutcome};

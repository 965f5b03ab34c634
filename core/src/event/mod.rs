//! Lifecycle event model.
//!
//! Events are immutable descriptions of a single lifecycle transition. They
//! carry enough metadata (priority, source, persistence flag) for observers
//! to branch without re-deriving context.

pub mod event;
pub mod types;

pub use event::LifecycleEvent;
pub use types::{EventPriority, EventSource, LifecycleEventType, LifecyclePhase};

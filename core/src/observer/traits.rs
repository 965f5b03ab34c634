use async_trait::async_trait;

use crate::event::{EventPriority, LifecycleEvent};
use crate::memento::{JsonMap, StateKey};

#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Stable identity; registering the same id twice is a no-op.
    fn observer_id(&self) -> &str;

    fn priority(&self) -> EventPriority {
        EventPriority::Medium
    }

    fn should_handle_event(&self, _event: &LifecycleEvent) -> bool {
        true
    }

    async fn on_lifecycle_event(&self, _event: &LifecycleEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A component that owns one slice of application state and can capture and
/// restore it.
#[async_trait]
pub trait StateAwareObserver: LifecycleObserver {
    fn state_key(&self) -> StateKey;

    /// Snapshot this component's slice. Must not block on I/O.
    fn capture_state(&self) -> JsonMap;

    /// Apply a previously captured slice. Restoring the same slice twice must
    /// leave the component in the same state.
    async fn restore_state(&self, state: JsonMap) -> anyhow::Result<()>;

    /// Schema check run before `restore_state`.
    fn validate_state(&self, _state: &JsonMap) -> bool {
        true
    }

    /// Replaces `should_handle_event` for state-aware observers.
    fn should_handle_state_event(&self, event: &LifecycleEvent) -> bool {
        event.should_persist_state() || event.is_foregrounding()
    }
}

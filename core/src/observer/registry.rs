//! Observer registry (the subject side of the lifecycle event bus).

use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::cmp::Reverse;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{LifecycleObserver, StateAwareObserver};
use crate::event::{EventPriority, LifecycleEvent};

/// A registered observer, plain or state-aware.
#[derive(Clone)]
pub enum ObserverHandle {
    Plain(Arc<dyn LifecycleObserver>),
    Stateful(Arc<dyn StateAwareObserver>),
}

impl ObserverHandle {
    pub fn observer_id(&self) -> &str {
        match self {
            Self::Plain(o) => o.observer_id(),
            Self::Stateful(o) => o.observer_id(),
        }
    }

    pub fn priority(&self) -> EventPriority {
        match self {
            Self::Plain(o) => o.priority(),
            Self::Stateful(o) => o.priority(),
        }
    }

    pub fn handles(&self, event: &LifecycleEvent) -> bool {
        match self {
            Self::Plain(o) => o.should_handle_event(event),
            Self::Stateful(o) => o.should_handle_state_event(event),
        }
    }

    pub fn as_state_aware(&self) -> Option<&Arc<dyn StateAwareObserver>> {
        match self {
            Self::Plain(_) => None,
            Self::Stateful(o) => Some(o),
        }
    }

    async fn notify(&self, event: &LifecycleEvent) -> anyhow::Result<()> {
        match self {
            Self::Plain(o) => o.on_lifecycle_event(event).await,
            Self::Stateful(o) => o.on_lifecycle_event(event).await,
        }
    }
}

/// Outcome of delivering one event to every registered observer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<ObserverHandle>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an observer with the same id is already registered.
    pub async fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) -> bool {
        self.insert(ObserverHandle::Plain(observer)).await
    }

    pub async fn add_state_observer(&self, observer: Arc<dyn StateAwareObserver>) -> bool {
        self.insert(ObserverHandle::Stateful(observer)).await
    }

    async fn insert(&self, handle: ObserverHandle) -> bool {
        let mut observers = self.observers.write().await;
        if observers
            .iter()
            .any(|o| o.observer_id() == handle.observer_id())
        {
            tracing::debug!(observer = %handle.observer_id(), "observer already registered");
            return false;
        }
        tracing::debug!(
            observer = %handle.observer_id(),
            priority = ?handle.priority(),
            state_aware = handle.as_state_aware().is_some(),
            "observer registered"
        );
        observers.push(handle);
        true
    }

    /// Returns false when no observer had that id.
    pub async fn remove_observer(&self, observer_id: &str) -> bool {
        let mut observers = self.observers.write().await;
        let before = observers.len();
        observers.retain(|o| o.observer_id() != observer_id);
        before != observers.len()
    }

    pub async fn clear(&self) -> usize {
        let mut observers = self.observers.write().await;
        let count = observers.len();
        observers.clear();
        count
    }

    pub async fn len(&self) -> usize {
        self.observers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.observers.read().await.is_empty()
    }

    pub async fn contains(&self, observer_id: &str) -> bool {
        self.observers
            .read()
            .await
            .iter()
            .any(|o| o.observer_id() == observer_id)
    }

    /// Snapshot of the observers, critical first; registration order is kept
    /// within a priority.
    pub async fn ordered(&self) -> Vec<ObserverHandle> {
        let mut snapshot = self.observers.read().await.clone();
        snapshot.sort_by_key(|o| Reverse(o.priority()));
        snapshot
    }

    /// State-aware observers interested in `event`, in dispatch order.
    pub async fn state_observers_for(
        &self,
        event: &LifecycleEvent,
    ) -> Vec<Arc<dyn StateAwareObserver>> {
        self.ordered()
            .await
            .into_iter()
            .filter_map(|o| match o {
                ObserverHandle::Stateful(s) if s.should_handle_state_event(event) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Deliver `event` to every interested observer.
    ///
    /// Errors and panics raised by one observer are logged and recorded in the
    /// report; delivery continues with the next observer.
    pub async fn dispatch(&self, event: &LifecycleEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        for observer in self.ordered().await {
            let id = observer.observer_id().to_string();

            let wants = match std::panic::catch_unwind(AssertUnwindSafe(|| observer.handles(event)))
            {
                Ok(wants) => wants,
                Err(panic) => {
                    let msg = panic_message(&*panic);
                    tracing::error!(
                        observer = %id,
                        error.kind = "observer.filter_panic",
                        error.message = %msg
                    );
                    report.failed.push((id, msg));
                    continue;
                }
            };
            if !wants {
                report.skipped.push(id);
                continue;
            }

            match AssertUnwindSafe(observer.notify(event)).catch_unwind().await {
                Ok(Ok(())) => report.delivered.push(id),
                Ok(Err(e)) => {
                    tracing::warn!(
                        observer = %id,
                        event_type = %event.event_type(),
                        error.kind = "observer.failed",
                        error.message = %e
                    );
                    report.failed.push((id, e.to_string()));
                }
                Err(panic) => {
                    let msg = panic_message(&*panic);
                    tracing::error!(
                        observer = %id,
                        event_type = %event.event_type(),
                        error.kind = "observer.panic",
                        error.message = %msg
                    );
                    report.failed.push((id, msg));
                }
            }
        }

        report
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "observer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LifecyclePhase;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        id: &'static str,
        priority: EventPriority,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl LifecycleObserver for Recorder {
        fn observer_id(&self) -> &str {
            self.id
        }

        fn priority(&self) -> EventPriority {
            self.priority
        }

        async fn on_lifecycle_event(&self, _event: &LifecycleEvent) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.id);
            if self.fail {
                anyhow::bail!("{} refused the event", self.id);
            }
            Ok(())
        }
    }

    struct Panicker;

    #[async_trait]
    impl LifecycleObserver for Panicker {
        fn observer_id(&self) -> &str {
            "panicker"
        }

        fn priority(&self) -> EventPriority {
            EventPriority::Critical
        }

        async fn on_lifecycle_event(&self, _event: &LifecycleEvent) -> anyhow::Result<()> {
            panic!("boom");
        }
    }

    fn recorder(
        id: &'static str,
        priority: EventPriority,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<Recorder> {
        Arc::new(Recorder {
            id,
            priority,
            log: log.clone(),
            fail: false,
        })
    }

    #[tokio::test]
    async fn test_add_and_remove_are_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new();

        assert!(registry.add_observer(recorder("a", EventPriority::Low, &log)).await);
        assert!(!registry.add_observer(recorder("a", EventPriority::High, &log)).await);
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove_observer("a").await);
        assert!(!registry.remove_observer("a").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_dispatch_in_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new();
        registry.add_observer(recorder("low", EventPriority::Low, &log)).await;
        registry.add_observer(recorder("medium-1", EventPriority::Medium, &log)).await;
        registry.add_observer(recorder("critical", EventPriority::Critical, &log)).await;
        registry.add_observer(recorder("medium-2", EventPriority::Medium, &log)).await;
        registry.add_observer(recorder("high", EventPriority::High, &log)).await;

        let report = registry
            .dispatch(&LifecycleEvent::backgrounding(LifecyclePhase::Inactive))
            .await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["critical", "high", "medium-1", "medium-2", "low"]
        );
        assert_eq!(report.delivered.len(), 5);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new();
        registry.add_observer(Arc::new(Panicker)).await;
        registry
            .add_observer(Arc::new(Recorder {
                id: "failing",
                priority: EventPriority::High,
                log: log.clone(),
                fail: true,
            }))
            .await;
        registry.add_observer(recorder("healthy", EventPriority::Low, &log)).await;

        let report = registry
            .dispatch(&LifecycleEvent::terminating(LifecyclePhase::Paused))
            .await;

        assert_eq!(*log.lock().unwrap(), vec!["failing", "healthy"]);
        assert_eq!(report.delivered, vec!["healthy".to_string()]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].0, "panicker");
        assert_eq!(report.failed[0].1, "boom");
    }
}

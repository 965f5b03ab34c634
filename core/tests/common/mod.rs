#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use statekeep_core::config::LifecycleConfig;
use statekeep_core::error::RepositoryError;
use statekeep_core::event::{EventPriority, LifecycleEvent};
use statekeep_core::lifecycle::LifecycleManager;
use statekeep_core::memento::{AppStateMemento, JsonMap, StateKey};
use statekeep_core::observer::{LifecycleObserver, StateAwareObserver};
use statekeep_core::repository::{InMemoryRepository, MementoRepository, RepositoryStatistics};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn map(value: Value) -> JsonMap {
    match value {
        Value::Object(m) => m,
        other => panic!("expected object, got {other}"),
    }
}

pub async fn ready_manager(repository: Arc<dyn MementoRepository>) -> LifecycleManager {
    ready_manager_with(repository, LifecycleConfig::default()).await
}

pub async fn ready_manager_with(
    repository: Arc<dyn MementoRepository>,
    config: LifecycleConfig,
) -> LifecycleManager {
    let manager = LifecycleManager::new(repository, config);
    manager.initialize().await.unwrap();
    manager
}

pub fn memory_repository() -> Arc<InMemoryRepository> {
    Arc::new(InMemoryRepository::new())
}

/// State-aware observer that records every call it receives.
pub struct RecordingObserver {
    id: String,
    key: StateKey,
    priority: EventPriority,
    state: Mutex<JsonMap>,
    valid: AtomicBool,
    pub captures: AtomicUsize,
    pub restores: AtomicUsize,
    pub events: AtomicUsize,
    pub restored: Mutex<Vec<JsonMap>>,
}

impl RecordingObserver {
    pub fn new(id: &str, key: StateKey, state: Value) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            key,
            priority: EventPriority::Medium,
            state: Mutex::new(map(state)),
            valid: AtomicBool::new(true),
            captures: AtomicUsize::new(0),
            restores: AtomicUsize::new(0),
            events: AtomicUsize::new(0),
            restored: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting(self: Arc<Self>) -> Arc<Self> {
        self.valid.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_state(&self, state: Value) {
        *self.state.lock().unwrap() = map(state);
    }

    pub fn restore_count(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }

    pub fn last_restored(&self) -> Option<JsonMap> {
        self.restored.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LifecycleObserver for RecordingObserver {
    fn observer_id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> EventPriority {
        self.priority
    }

    async fn on_lifecycle_event(&self, _event: &LifecycleEvent) -> anyhow::Result<()> {
        self.events.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl StateAwareObserver for RecordingObserver {
    fn state_key(&self) -> StateKey {
        self.key.clone()
    }

    fn capture_state(&self) -> JsonMap {
        self.captures.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().clone()
    }

    async fn restore_state(&self, state: JsonMap) -> anyhow::Result<()> {
        // widen the window for overlapping restores
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.restores.fetch_add(1, Ordering::SeqCst);
        self.restored.lock().unwrap().push(state);
        Ok(())
    }

    fn validate_state(&self, _state: &JsonMap) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}

/// Plain observer that always fails, by error or by panic.
pub struct FailingObserver {
    pub id: String,
    pub panic: bool,
}

#[async_trait]
impl LifecycleObserver for FailingObserver {
    fn observer_id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> EventPriority {
        EventPriority::Critical
    }

    async fn on_lifecycle_event(&self, _event: &LifecycleEvent) -> anyhow::Result<()> {
        if self.panic {
            panic!("observer {} blew up", self.id);
        }
        anyhow::bail!("observer {} failed", self.id)
    }
}

/// Wraps a repository and delays selected calls.
pub struct SlowRepository {
    pub inner: InMemoryRepository,
    pub save_delay: Duration,
    pub read_delay: Duration,
    pub saves: AtomicUsize,
}

impl SlowRepository {
    pub fn new(save_delay: Duration, read_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryRepository::new(),
            save_delay,
            read_delay,
            saves: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MementoRepository for SlowRepository {
    fn name(&self) -> &str {
        "slow"
    }

    async fn initialize(&self) -> Result<(), RepositoryError> {
        self.inner.initialize().await
    }

    async fn is_initialized(&self) -> bool {
        self.inner.is_initialized().await
    }

    async fn save_memento(&self, memento: &AppStateMemento) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.save_delay).await;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_memento(memento).await
    }

    async fn get_latest_memento(&self) -> Result<Option<AppStateMemento>, RepositoryError> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.get_latest_memento().await
    }

    async fn get_memento_by_id(
        &self,
        id: &str,
    ) -> Result<Option<AppStateMemento>, RepositoryError> {
        self.inner.get_memento_by_id(id).await
    }

    async fn get_all_mementos(&self) -> Result<Vec<AppStateMemento>, RepositoryError> {
        self.inner.get_all_mementos().await
    }

    async fn delete_memento(&self, id: &str) -> Result<bool, RepositoryError> {
        self.inner.delete_memento(id).await
    }

    async fn clear_all_mementos(&self) -> Result<usize, RepositoryError> {
        self.inner.clear_all_mementos().await
    }

    async fn get_statistics(&self) -> Result<RepositoryStatistics, RepositoryError> {
        self.inner.get_statistics().await
    }

    async fn dispose(&self) -> Result<(), RepositoryError> {
        self.inner.dispose().await
    }
}

pub fn session_state(uid: &str) -> Value {
    json!({ "userId": uid, "isAuthenticated": true })
}

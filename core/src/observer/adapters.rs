//! Ready-made state-aware observers built by composition.
//!
//! Components that own state rarely want to implement the observer traits
//! themselves. `ClosureStateObserver` wraps capture/restore/validate closures;
//! `SliceObserver` owns a typed slice and exposes it to the component.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::{Arc, RwLock};

use super::traits::{LifecycleObserver, StateAwareObserver};
use crate::event::EventPriority;
use crate::memento::{JsonMap, StateKey, StateSlice};

type CaptureFn = Arc<dyn Fn() -> JsonMap + Send + Sync>;
type RestoreFn = Arc<dyn Fn(JsonMap) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
type ValidateFn = Arc<dyn Fn(&JsonMap) -> bool + Send + Sync>;

pub struct ClosureStateObserver {
    id: String,
    key: StateKey,
    priority: EventPriority,
    capture: CaptureFn,
    restore: RestoreFn,
    validate: Option<ValidateFn>,
}

impl ClosureStateObserver {
    pub fn builder(id: impl Into<String>, key: StateKey) -> ClosureStateObserverBuilder {
        ClosureStateObserverBuilder {
            id: id.into(),
            key,
            priority: EventPriority::Medium,
            capture: Arc::new(JsonMap::new),
            restore: Arc::new(|_: JsonMap| async { Ok::<(), anyhow::Error>(()) }.boxed()),
            validate: None,
        }
    }
}

pub struct ClosureStateObserverBuilder {
    id: String,
    key: StateKey,
    priority: EventPriority,
    capture: CaptureFn,
    restore: RestoreFn,
    validate: Option<ValidateFn>,
}

impl ClosureStateObserverBuilder {
    pub fn priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn capture<F>(mut self, f: F) -> Self
    where
        F: Fn() -> JsonMap + Send + Sync + 'static,
    {
        self.capture = Arc::new(f);
        self
    }

    /// Asynchronous restore, e.g. one that waits for the component to attach.
    pub fn restore<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(JsonMap) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.restore = Arc::new(move |state| f(state).boxed());
        self
    }

    pub fn restore_sync<F>(mut self, f: F) -> Self
    where
        F: Fn(JsonMap) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.restore = Arc::new(move |state| {
            let result = f(state);
            async move { result }.boxed()
        });
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&JsonMap) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> ClosureStateObserver {
        ClosureStateObserver {
            id: self.id,
            key: self.key,
            priority: self.priority,
            capture: self.capture,
            restore: self.restore,
            validate: self.validate,
        }
    }
}

#[async_trait]
impl LifecycleObserver for ClosureStateObserver {
    fn observer_id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> EventPriority {
        self.priority
    }
}

#[async_trait]
impl StateAwareObserver for ClosureStateObserver {
    fn state_key(&self) -> StateKey {
        self.key.clone()
    }

    fn capture_state(&self) -> JsonMap {
        (self.capture)()
    }

    async fn restore_state(&self, state: JsonMap) -> anyhow::Result<()> {
        (self.restore)(state).await
    }

    fn validate_state(&self, state: &JsonMap) -> bool {
        self.validate.as_ref().map_or(true, |v| v(state))
    }
}

/// Observer owning a typed slice.
///
/// The component reads and writes the slice through `get`/`set`/`update`;
/// capture serializes it, validation is a successful parse, restore replaces
/// it wholesale.
pub struct SliceObserver<S: StateSlice> {
    id: String,
    key: StateKey,
    priority: EventPriority,
    state: RwLock<S>,
}

impl<S: StateSlice> SliceObserver<S> {
    pub fn new(id: impl Into<String>, initial: S) -> Self {
        Self {
            id: id.into(),
            key: S::state_key(),
            priority: EventPriority::Medium,
            state: RwLock::new(initial),
        }
    }

    /// Store the slice under a component-specific key instead of the
    /// category default.
    pub fn with_key(mut self, key: StateKey) -> Self {
        self.key = key;
        self
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn get(&self) -> S {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, value: S) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = value;
    }

    pub fn update(&self, f: impl FnOnce(&mut S)) {
        f(&mut self.state.write().unwrap_or_else(|e| e.into_inner()));
    }
}

#[async_trait]
impl<S: StateSlice> LifecycleObserver for SliceObserver<S> {
    fn observer_id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> EventPriority {
        self.priority
    }
}

#[async_trait]
impl<S: StateSlice> StateAwareObserver for SliceObserver<S> {
    fn state_key(&self) -> StateKey {
        self.key.clone()
    }

    fn capture_state(&self) -> JsonMap {
        match self.get().to_map() {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    observer = %self.id,
                    error.kind = "observer.capture_serialize",
                    error.message = %e
                );
                JsonMap::new()
            }
        }
    }

    async fn restore_state(&self, state: JsonMap) -> anyhow::Result<()> {
        let parsed = S::from_map(&state)?;
        self.set(parsed);
        Ok(())
    }

    fn validate_state(&self, state: &JsonMap) -> bool {
        S::from_map(state).is_ok()
    }
}

//! Lifecycle manager

use futures::FutureExt;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex, RwLock};

use super::report::{CycleReport, RestoreOutcome};
use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, RepositoryError};
use crate::event::{EventSource, LifecycleEvent, LifecyclePhase};
use crate::events_out::{write_telemetry, EventsOutTx, TelemetryKind, TelemetryRecord};
use crate::memento::{AppStateMemento, JsonMap};
use crate::observer::registry::panic_message;
use crate::observer::{LifecycleObserver, ObserverRegistry, StateAwareObserver};
use crate::repository::MementoRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerStatus {
    Created,
    Ready,
    Disposed,
}

struct PhaseTracker {
    phase: LifecyclePhase,
    since: Instant,
}

/// State carried between cycles. Guarded by the cycle lock.
#[derive(Default)]
struct CycleState {
    /// Observers restored during the current foreground episode.
    restored: HashSet<String>,
}

/// Drives capture and restore cycles.
///
/// Cheap to clone; clones share the same registry, repository and cycle lock.
/// Cycles run strictly one after another in arrival order.
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: LifecycleConfig,
    registry: ObserverRegistry,
    repository: Arc<dyn MementoRepository>,
    phase: RwLock<Option<PhaseTracker>>,
    /// FIFO: tokio's mutex grants the lock in request order.
    cycle: Mutex<CycleState>,
    status: RwLock<ManagerStatus>,
    event_tx: broadcast::Sender<LifecycleEvent>,
    events_out: Option<EventsOutTx>,
}

impl LifecycleManager {
    pub fn new(repository: Arc<dyn MementoRepository>, config: LifecycleConfig) -> Self {
        Self::with_events_out(repository, config, None)
    }

    pub fn with_events_out(
        repository: Arc<dyn MementoRepository>,
        config: LifecycleConfig,
        events_out: Option<EventsOutTx>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        let inner = ManagerInner {
            config,
            registry: ObserverRegistry::new(),
            repository,
            phase: RwLock::new(None),
            cycle: Mutex::new(CycleState::default()),
            status: RwLock::new(ManagerStatus::Created),
            event_tx,
            events_out,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Initialize the repository and open the manager for events.
    ///
    /// A repository that fails to initialize does not block the manager:
    /// cycles still run and report the repository errors.
    pub async fn initialize(&self) -> Result<(), LifecycleError> {
        let mut status = self.inner.status.write().await;
        match *status {
            ManagerStatus::Disposed => return Err(LifecycleError::Disposed),
            ManagerStatus::Ready => return Ok(()),
            ManagerStatus::Created => {}
        }

        match self.with_timeout(self.inner.repository.initialize()).await {
            Ok(()) => tracing::info!(
                repository = %self.inner.repository.name(),
                "lifecycle manager initialized"
            ),
            Err(e) => tracing::warn!(
                repository = %self.inner.repository.name(),
                error.kind = e.kind(),
                error.message = %e,
                "repository unavailable, state will not be persisted"
            ),
        }

        *status = ManagerStatus::Ready;
        Ok(())
    }

    pub async fn status(&self) -> ManagerStatus {
        *self.inner.status.read().await
    }

    /// Phase of the last processed phase report or host event.
    pub async fn current_phase(&self) -> Option<LifecyclePhase> {
        self.inner.phase.read().await.as_ref().map(|t| t.phase)
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &ObserverRegistry {
        &self.inner.registry
    }

    pub fn repository(&self) -> Arc<dyn MementoRepository> {
        Arc::clone(&self.inner.repository)
    }

    /// Every processed event, in processing order.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.event_tx.subscribe()
    }

    pub async fn register_observer(
        &self,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Result<bool, LifecycleError> {
        self.ensure_open().await?;
        Ok(self.inner.registry.add_observer(observer).await)
    }

    pub async fn register_state_observer(
        &self,
        observer: Arc<dyn StateAwareObserver>,
    ) -> Result<bool, LifecycleError> {
        self.ensure_open().await?;
        Ok(self.inner.registry.add_state_observer(observer).await)
    }

    pub async fn unregister_observer(&self, observer_id: &str) -> Result<bool, LifecycleError> {
        self.ensure_open().await?;
        Ok(self.inner.registry.remove_observer(observer_id).await)
    }

    /// Record a platform phase report and run the cycle it implies.
    ///
    /// Every report is accepted; `previous_state` and `state_duration` come
    /// from the last report.
    pub async fn handle_phase_change(
        &self,
        phase: LifecyclePhase,
    ) -> Result<CycleReport, LifecycleError> {
        let mut cycle = self.inner.cycle.lock().await;
        self.ensure_ready().await?;

        let event = {
            let mut tracker = self.inner.phase.write().await;
            let now = Instant::now();
            let (previous, duration) = match tracker.as_ref() {
                Some(t) => (Some(t.phase), Some(now.duration_since(t.since))),
                None => (None, None),
            };
            *tracker = Some(PhaseTracker { phase, since: now });
            LifecycleEvent::from_phase_change(previous, phase, duration)
        };

        Ok(self.process(&mut cycle, event).await)
    }

    /// Run the cycle for an event built by the host (low memory,
    /// connectivity, battery, orientation).
    ///
    /// The event's `current_state` becomes the current phase when it differs
    /// from the tracked one.
    pub async fn handle_event(&self, event: LifecycleEvent) -> Result<CycleReport, LifecycleError> {
        let mut cycle = self.inner.cycle.lock().await;
        self.ensure_ready().await?;

        {
            let mut tracker = self.inner.phase.write().await;
            let phase = event.current_state();
            if tracker.as_ref().map(|t| t.phase) != Some(phase) {
                *tracker = Some(PhaseTracker {
                    phase,
                    since: Instant::now(),
                });
            }
        }

        Ok(self.process(&mut cycle, event).await)
    }

    /// Capture and persist immediately, on behalf of the user.
    pub async fn save_now(&self, metadata: JsonMap) -> Result<CycleReport, LifecycleError> {
        let mut cycle = self.inner.cycle.lock().await;
        self.ensure_ready().await?;

        let phase = self.current_phase().await.unwrap_or(LifecyclePhase::Resumed);
        let mut event = LifecycleEvent::manual_save(phase);
        for (key, value) in metadata {
            event = event.with_metadata(key, value);
        }

        Ok(self.process(&mut cycle, event).await)
    }

    /// Restore from the latest memento outside a foreground transition, e.g.
    /// on cold start. Starts a new restore episode.
    pub async fn restore_now(&self) -> Result<CycleReport, LifecycleError> {
        let mut cycle = self.inner.cycle.lock().await;
        self.ensure_ready().await?;

        cycle.restored.clear();
        let event = LifecycleEvent::foregrounding(LifecyclePhase::Detached)
            .with_source(EventSource::Application)
            .with_metadata("trigger", "restoreNow");
        let mut report = CycleReport::new(event.event_id(), event.event_type());
        self.restore_latest(&event, &mut cycle, &mut report).await;
        Ok(report)
    }

    /// Wait for the running cycle, drop every observer and dispose the
    /// repository. The manager rejects all calls afterwards.
    pub async fn dispose(&self) -> Result<(), LifecycleError> {
        let mut cycle = self.inner.cycle.lock().await;
        {
            let mut status = self.inner.status.write().await;
            if *status == ManagerStatus::Disposed {
                return Err(LifecycleError::Disposed);
            }
            *status = ManagerStatus::Disposed;
        }

        cycle.restored.clear();
        let removed = self.inner.registry.clear().await;
        if let Err(e) = self.inner.repository.dispose().await {
            tracing::warn!(
                error.kind = e.kind(),
                error.message = %e,
                "repository dispose failed"
            );
        }

        tracing::info!(observers = removed, "lifecycle manager disposed");
        Ok(())
    }

    async fn ensure_ready(&self) -> Result<(), LifecycleError> {
        match *self.inner.status.read().await {
            ManagerStatus::Ready => Ok(()),
            ManagerStatus::Created => Err(LifecycleError::NotInitialized),
            ManagerStatus::Disposed => Err(LifecycleError::Disposed),
        }
    }

    /// Observers may be registered before `initialize`.
    async fn ensure_open(&self) -> Result<(), LifecycleError> {
        match *self.inner.status.read().await {
            ManagerStatus::Disposed => Err(LifecycleError::Disposed),
            _ => Ok(()),
        }
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        match tokio::time::timeout(self.inner.config.io_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout(self.inner.config.io_timeout_ms)),
        }
    }

    /// Save on a spawned task so that hitting the timeout stops the wait,
    /// never the write.
    async fn save_detached(&self, memento: &AppStateMemento) -> Result<(), RepositoryError> {
        let repository = Arc::clone(&self.inner.repository);
        let record = memento.clone();
        let task = tokio::spawn(async move { repository.save_memento(&record).await });

        match tokio::time::timeout(self.inner.config.io_timeout(), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(RepositoryError::Aborted(join.to_string())),
            Err(_) => {
                tracing::warn!(
                    memento_id = %memento.id,
                    timeout_ms = self.inner.config.io_timeout_ms,
                    "memento save still running in the background"
                );
                Err(RepositoryError::Timeout(self.inner.config.io_timeout_ms))
            }
        }
    }

    async fn telemetry(&self, record: TelemetryRecord) {
        write_telemetry(self.inner.events_out.as_ref(), &record).await;
    }

    async fn process(&self, cycle: &mut CycleState, event: LifecycleEvent) -> CycleReport {
        let mut report = CycleReport::new(event.event_id(), event.event_type());

        tracing::info!(
            event_id = %event.event_id(),
            event_type = %event.event_type(),
            previous = ?event.previous_state(),
            current = %event.current_state(),
            source = %event.source(),
            persist = event.should_persist_state(),
            "lifecycle event"
        );
        let _ = self.inner.event_tx.send(event.clone());
        self.telemetry(
            TelemetryRecord::new(TelemetryKind::Event, event.event_id())
                .detail(event.event_type().as_str()),
        )
        .await;

        report.dispatch = self.inner.registry.dispatch(&event).await;

        if event.should_persist_state() {
            self.capture_and_persist(&event, &mut report).await;
        }

        if event.is_backgrounding() || event.is_terminating() {
            cycle.restored.clear();
        }

        if event.is_foregrounding() {
            self.restore_latest(&event, cycle, &mut report).await;
        }

        report
    }

    async fn capture_and_persist(&self, event: &LifecycleEvent, report: &mut CycleReport) {
        let observers = self.inner.registry.state_observers_for(event).await;
        let mut memento = AppStateMemento::new(event.current_state())
            .with_originator(event.source().as_str());

        for observer in observers {
            let id = observer.observer_id().to_string();
            let key = observer.state_key();

            let captured = std::panic::catch_unwind(AssertUnwindSafe(|| observer.capture_state()));
            let slice = match captured {
                Ok(slice) => slice,
                Err(panic) => {
                    let msg = panic_message(&*panic);
                    tracing::error!(
                        observer = %id,
                        state_key = %key,
                        error.kind = "observer.capture_panic",
                        error.message = %msg
                    );
                    self.telemetry(
                        TelemetryRecord::new(TelemetryKind::Failure, event.event_id())
                            .observer(&id)
                            .state_key(&key)
                            .detail(msg.clone()),
                    )
                    .await;
                    report.capture_failures.push((id, msg));
                    continue;
                }
            };

            if slice.is_empty() {
                tracing::debug!(observer = %id, state_key = %key, "empty slice, nothing captured");
                continue;
            }

            if let Err(e) = memento.apply_slice(&key, slice) {
                tracing::warn!(
                    observer = %id,
                    state_key = %key,
                    error.kind = "observer.capture_invalid",
                    error.message = %e
                );
                report.capture_failures.push((id, e.to_string()));
                continue;
            }

            self.telemetry(
                TelemetryRecord::new(TelemetryKind::Capture, event.event_id())
                    .observer(&id)
                    .state_key(&key),
            )
            .await;
            report.captured.push(key.to_string());
        }

        if report.captured.is_empty() {
            tracing::debug!(event_id = %event.event_id(), "no state captured, save skipped");
            return;
        }

        if self.inner.config.merge_previous {
            match self
                .with_timeout(self.inner.repository.get_latest_memento())
                .await
            {
                Ok(Some(previous)) => memento = previous.merge_with(&memento),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    error.kind = e.kind(),
                    error.message = %e,
                    "previous memento unavailable, saving capture alone"
                ),
            }
        }

        match self.save_detached(&memento).await {
            Ok(()) => {
                tracing::info!(
                    memento_id = %memento.id,
                    slices = report.captured.len(),
                    "memento persisted"
                );
                self.telemetry(
                    TelemetryRecord::new(TelemetryKind::Persist, event.event_id())
                        .memento(&memento.id),
                )
                .await;
                report.persisted = Some(memento.id);
            }
            Err(e) => {
                tracing::warn!(
                    memento_id = %memento.id,
                    error.kind = e.kind(),
                    error.message = %e,
                    "memento save failed"
                );
                self.telemetry(
                    TelemetryRecord::new(TelemetryKind::Failure, event.event_id())
                        .memento(&memento.id)
                        .detail(e.to_string()),
                )
                .await;
                report.persist_error = Some(e.to_string());
            }
        }
    }

    async fn restore_latest(
        &self,
        event: &LifecycleEvent,
        cycle: &mut CycleState,
        report: &mut CycleReport,
    ) {
        let latest = match self
            .with_timeout(self.inner.repository.get_latest_memento())
            .await
        {
            Ok(Some(memento)) => memento,
            Ok(None) => {
                tracing::info!("no memento stored, nothing to restore");
                report.restore = RestoreOutcome::NoMemento;
                return;
            }
            Err(e) => {
                tracing::warn!(
                    error.kind = e.kind(),
                    error.message = %e,
                    "latest memento unavailable, restore skipped"
                );
                report.restore = RestoreOutcome::Failed(e.to_string());
                return;
            }
        };

        if let Some(max_age) = self.inner.config.restore_max_age() {
            if latest.is_stale(max_age) {
                tracing::info!(
                    memento_id = %latest.id,
                    age_secs = latest.age().as_secs(),
                    "latest memento is stale, restore skipped"
                );
                self.telemetry(
                    TelemetryRecord::new(TelemetryKind::Skip, event.event_id())
                        .memento(&latest.id)
                        .detail("stale"),
                )
                .await;
                report.restore = RestoreOutcome::Stale(latest.id);
                return;
            }
        }

        report.restore = RestoreOutcome::Applied(latest.id.clone());

        for observer in self.inner.registry.state_observers_for(event).await {
            let id = observer.observer_id().to_string();
            let key = observer.state_key();

            if cycle.restored.contains(&id) {
                report.already_restored.push(id);
                continue;
            }

            let Some(slice) = latest.slice(&key) else {
                tracing::debug!(observer = %id, state_key = %key, "no slice stored for observer");
                continue;
            };

            let valid =
                std::panic::catch_unwind(AssertUnwindSafe(|| observer.validate_state(&slice)))
                    .unwrap_or(false);
            if !valid {
                tracing::warn!(
                    observer = %id,
                    state_key = %key,
                    memento_id = %latest.id,
                    "stored slice failed validation, restore skipped"
                );
                self.telemetry(
                    TelemetryRecord::new(TelemetryKind::Skip, event.event_id())
                        .observer(&id)
                        .state_key(&key)
                        .memento(&latest.id)
                        .detail("validation"),
                )
                .await;
                report.validation_skipped.push(id);
                continue;
            }

            match AssertUnwindSafe(observer.restore_state(slice))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {
                    tracing::debug!(observer = %id, state_key = %key, "state restored");
                    self.telemetry(
                        TelemetryRecord::new(TelemetryKind::Restore, event.event_id())
                            .observer(&id)
                            .state_key(&key)
                            .memento(&latest.id),
                    )
                    .await;
                    cycle.restored.insert(id.clone());
                    report.restored.push(id);
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        observer = %id,
                        state_key = %key,
                        error.kind = "observer.restore_failed",
                        error.message = %e
                    );
                    report.restore_failures.push((id, e.to_string()));
                }
                Err(panic) => {
                    let msg = panic_message(&*panic);
                    tracing::error!(
                        observer = %id,
                        state_key = %key,
                        error.kind = "observer.restore_panic",
                        error.message = %msg
                    );
                    report.restore_failures.push((id, msg));
                }
            }
        }
    }
}

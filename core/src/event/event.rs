//! Immutable lifecycle event record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

use super::types::{EventPriority, EventSource, LifecycleEventType, LifecyclePhase};

/// A single lifecycle transition.
///
/// `should_persist_state` is always derived from `event_type`; there is no way
/// to construct an event where the two disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    event_id: String,
    timestamp: DateTime<Utc>,
    previous_state: Option<LifecyclePhase>,
    current_state: LifecyclePhase,
    event_type: LifecycleEventType,
    state_duration_ms: Option<u64>,
    metadata: Map<String, Value>,
    should_persist_state: bool,
    priority: EventPriority,
    source: EventSource,
}

impl LifecycleEvent {
    pub fn new(event_type: LifecycleEventType, current_state: LifecyclePhase) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            previous_state: None,
            current_state,
            event_type,
            state_duration_ms: None,
            metadata: Map::new(),
            should_persist_state: event_type.persists_state(),
            priority: event_type.default_priority(),
            source: EventSource::System,
        }
    }

    /// Classify a platform phase report.
    ///
    /// `paused` is backgrounding, `detached` is terminating, `resumed` coming
    /// from `paused`/`detached` is foregrounding; anything else is a plain
    /// state change.
    pub fn from_phase_change(
        previous: Option<LifecyclePhase>,
        current: LifecyclePhase,
        state_duration: Option<Duration>,
    ) -> Self {
        let event_type = match current {
            LifecyclePhase::Paused => LifecycleEventType::Backgrounding,
            LifecyclePhase::Detached => LifecycleEventType::Terminating,
            LifecyclePhase::Resumed if previous.is_some_and(|p| p.is_backgrounded()) => {
                LifecycleEventType::Foregrounding
            }
            _ => LifecycleEventType::StateChange,
        };

        let mut event = Self::new(event_type, current);
        event.previous_state = previous;
        event.state_duration_ms = state_duration.map(|d| d.as_millis() as u64);
        event
    }

    pub fn backgrounding(previous: LifecyclePhase) -> Self {
        Self::new(LifecycleEventType::Backgrounding, LifecyclePhase::Paused).with_previous(previous)
    }

    pub fn foregrounding(previous: LifecyclePhase) -> Self {
        Self::new(LifecycleEventType::Foregrounding, LifecyclePhase::Resumed)
            .with_previous(previous)
    }

    pub fn terminating(previous: LifecyclePhase) -> Self {
        Self::new(LifecycleEventType::Terminating, LifecyclePhase::Detached)
            .with_previous(previous)
    }

    /// User-triggered save at the current phase.
    pub fn manual_save(current: LifecyclePhase) -> Self {
        Self::new(LifecycleEventType::ManualSave, current).with_source(EventSource::User)
    }

    pub fn low_memory(current: LifecyclePhase) -> Self {
        Self::new(LifecycleEventType::LowMemory, current).with_source(EventSource::Device)
    }

    pub fn with_previous(mut self, previous: LifecyclePhase) -> Self {
        self.previous_state = Some(previous);
        self
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: EventSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_state_duration(mut self, duration: Duration) -> Self {
        self.state_duration_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn previous_state(&self) -> Option<LifecyclePhase> {
        self.previous_state
    }

    pub fn current_state(&self) -> LifecyclePhase {
        self.current_state
    }

    pub fn event_type(&self) -> LifecycleEventType {
        self.event_type
    }

    /// How long the app stayed in `previous_state`.
    pub fn state_duration(&self) -> Option<Duration> {
        self.state_duration_ms.map(Duration::from_millis)
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn should_persist_state(&self) -> bool {
        self.should_persist_state
    }

    pub fn priority(&self) -> EventPriority {
        self.priority
    }

    pub fn source(&self) -> EventSource {
        self.source
    }

    pub fn is_backgrounding(&self) -> bool {
        self.event_type == LifecycleEventType::Backgrounding
    }

    /// True only for a transition from `paused`/`detached` into `resumed`.
    pub fn is_foregrounding(&self) -> bool {
        self.current_state == LifecyclePhase::Resumed
            && self.previous_state.is_some_and(|p| p.is_backgrounded())
    }

    pub fn is_terminating(&self) -> bool {
        self.event_type == LifecycleEventType::Terminating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_flag_follows_type() {
        assert!(LifecycleEvent::backgrounding(LifecyclePhase::Inactive).should_persist_state());
        assert!(LifecycleEvent::terminating(LifecyclePhase::Paused).should_persist_state());
        assert!(LifecycleEvent::manual_save(LifecyclePhase::Resumed).should_persist_state());
        assert!(LifecycleEvent::low_memory(LifecyclePhase::Resumed).should_persist_state());
        assert!(!LifecycleEvent::foregrounding(LifecyclePhase::Paused).should_persist_state());

        let overridden = LifecycleEvent::new(
            LifecycleEventType::OrientationChange,
            LifecyclePhase::Resumed,
        )
        .with_priority(EventPriority::Critical);
        assert!(!overridden.should_persist_state());
        assert_eq!(overridden.priority(), EventPriority::Critical);
    }

    #[test]
    fn test_priority_and_source_defaults() {
        let terminating = LifecycleEvent::terminating(LifecyclePhase::Paused);
        assert_eq!(terminating.priority(), EventPriority::Critical);
        assert_eq!(terminating.source(), EventSource::System);

        let manual = LifecycleEvent::manual_save(LifecyclePhase::Resumed);
        assert_eq!(manual.priority(), EventPriority::Medium);
        assert_eq!(manual.source(), EventSource::User);
    }

    #[test]
    fn test_phase_change_classification() {
        let ev = LifecycleEvent::from_phase_change(
            Some(LifecyclePhase::Inactive),
            LifecyclePhase::Paused,
            None,
        );
        assert_eq!(ev.event_type(), LifecycleEventType::Backgrounding);
        assert!(ev.is_backgrounding());

        let ev = LifecycleEvent::from_phase_change(
            Some(LifecyclePhase::Paused),
            LifecyclePhase::Resumed,
            Some(Duration::from_secs(3)),
        );
        assert_eq!(ev.event_type(), LifecycleEventType::Foregrounding);
        assert!(ev.is_foregrounding());
        assert_eq!(ev.state_duration(), Some(Duration::from_secs(3)));

        let ev = LifecycleEvent::from_phase_change(
            Some(LifecyclePhase::Inactive),
            LifecyclePhase::Resumed,
            None,
        );
        assert_eq!(ev.event_type(), LifecycleEventType::StateChange);
        assert!(!ev.is_foregrounding());

        let ev = LifecycleEvent::from_phase_change(None, LifecyclePhase::Detached, None);
        assert!(ev.is_terminating());
        assert!(ev.should_persist_state());
    }

    #[test]
    fn test_foregrounding_requires_backgrounded_origin() {
        let from_hidden = LifecycleEvent::new(
            LifecycleEventType::Foregrounding,
            LifecyclePhase::Resumed,
        )
        .with_previous(LifecyclePhase::Hidden);
        assert!(!from_hidden.is_foregrounding());

        let from_detached = LifecycleEvent::foregrounding(LifecyclePhase::Detached);
        assert!(from_detached.is_foregrounding());
    }

    #[test]
    fn test_serialized_shape() {
        let ev =
            LifecycleEvent::manual_save(LifecyclePhase::Resumed).with_metadata("reason", "menu");
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["eventType"], "manualSave");
        assert_eq!(json["shouldPersistState"], true);
        assert_eq!(json["source"], "user");
        assert_eq!(json["metadata"]["reason"], "menu");
    }
}

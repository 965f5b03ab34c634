use serde::Serialize;

use crate::event::LifecycleEventType;
use crate::observer::DispatchReport;

/// Why a foreground restore did or did not happen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum RestoreOutcome {
    /// The event did not call for a restore.
    #[default]
    NotRequested,
    /// Restore ran against the given memento.
    Applied(String),
    NoMemento,
    /// The latest memento was older than the configured maximum age.
    Stale(String),
    Failed(String),
}

/// Everything one lifecycle cycle did.
///
/// Failures are reported here instead of being returned, so a single broken
/// observer or an unavailable repository never aborts the cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub event_id: String,
    pub event_type: LifecycleEventType,
    pub dispatch: DispatchReport,

    /// State keys that contributed a slice to the persisted memento.
    pub captured: Vec<String>,
    pub capture_failures: Vec<(String, String)>,
    pub persisted: Option<String>,
    pub persist_error: Option<String>,

    pub restore: RestoreOutcome,
    pub restored: Vec<String>,
    pub validation_skipped: Vec<String>,
    /// Observers skipped because they already restored in this episode.
    pub already_restored: Vec<String>,
    pub restore_failures: Vec<(String, String)>,
}

impl CycleReport {
    pub(crate) fn new(event_id: &str, event_type: LifecycleEventType) -> Self {
        Self {
            event_id: event_id.to_string(),
            event_type,
            dispatch: DispatchReport::default(),
            captured: Vec::new(),
            capture_failures: Vec::new(),
            persisted: None,
            persist_error: None,
            restore: RestoreOutcome::NotRequested,
            restored: Vec::new(),
            validation_skipped: Vec::new(),
            already_restored: Vec::new(),
            restore_failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.dispatch.failed.is_empty()
            && self.capture_failures.is_empty()
            && self.persist_error.is_none()
            && self.restore_failures.is_empty()
            && !matches!(self.restore, RestoreOutcome::Failed(_))
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events_out::EventsOutTx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    Event,
    Capture,
    Persist,
    Restore,
    Skip,
    Failure,
}

/// One line of lifecycle telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    pub ts: DateTime<Utc>,
    pub kind: TelemetryKind,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memento_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TelemetryRecord {
    pub fn new(kind: TelemetryKind, event_id: &str) -> Self {
        Self {
            ts: Utc::now(),
            kind,
            event_id: event_id.to_string(),
            observer: None,
            state_key: None,
            memento_id: None,
            detail: None,
        }
    }

    pub fn observer(mut self, observer: &str) -> Self {
        self.observer = Some(observer.to_string());
        self
    }

    pub fn state_key(mut self, key: impl ToString) -> Self {
        self.state_key = Some(key.to_string());
        self
    }

    pub fn memento(mut self, memento_id: &str) -> Self {
        self.memento_id = Some(memento_id.to_string());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub async fn write_telemetry(out: Option<&EventsOutTx>, record: &TelemetryRecord) {
    let Some(out) = out else {
        return;
    };
    if let Ok(line) = serde_json::to_string(record) {
        out.send_line(line).await;
    }
}

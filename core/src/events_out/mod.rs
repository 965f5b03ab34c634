//! JSONL telemetry sink for lifecycle activity.

pub mod helpers;
pub mod writer;

pub use crate::config::EventsOutConfig;
pub use helpers::{write_telemetry, TelemetryKind, TelemetryRecord};
pub use writer::{start_events_out, EventsOutTx};

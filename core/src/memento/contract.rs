//! The generic memento contract and its per-component implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use super::slices::{ConfigSlice, NavigationSlice, PatternSlice, SessionSlice, StateSlice, UiSlice};
use super::{JsonMap, MEMENTO_STATE_VERSION};

/// Common surface of every memento.
///
/// Age and staleness are always computed against the wall clock at call time,
/// never frozen at creation.
pub trait StateMemento {
    fn memento_id(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
    fn originator_id(&self) -> &str;
    fn state_version(&self) -> &str;
    fn to_map(&self) -> Result<JsonMap, serde_json::Error>;

    fn age(&self) -> Duration {
        age_at(self.timestamp(), Utc::now())
    }

    fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}

/// Elapsed time from `timestamp` to `now`; future timestamps count as age zero.
pub fn age_at(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - timestamp).to_std().unwrap_or(Duration::ZERO)
}

/// Memento holding one typed slice on behalf of a single originator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMemento<S> {
    pub memento_id: String,
    pub timestamp: DateTime<Utc>,
    pub originator_id: String,
    pub state_version: String,
    pub state: S,
}

pub type SessionMemento = ComponentMemento<SessionSlice>;
pub type NavigationMemento = ComponentMemento<NavigationSlice>;
pub type UiMemento = ComponentMemento<UiSlice>;
pub type PatternMemento = ComponentMemento<PatternSlice>;
pub type ConfigMemento = ComponentMemento<ConfigSlice>;

impl<S: StateSlice> ComponentMemento<S> {
    pub fn new(originator_id: impl Into<String>, state: S) -> Self {
        Self {
            memento_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            originator_id: originator_id.into(),
            state_version: MEMENTO_STATE_VERSION.to_string(),
            state,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn from_map(map: &JsonMap) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map.clone()))
    }
}

impl<S: StateSlice> StateMemento for ComponentMemento<S> {
    fn memento_id(&self) -> &str {
        &self.memento_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn originator_id(&self) -> &str {
        &self.originator_id
    }

    fn state_version(&self) -> &str {
        &self.state_version
    }

    fn to_map(&self) -> Result<JsonMap, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(<serde_json::Error as serde::ser::Error>::custom(
                "component memento serialized to a non-object value",
            )),
        }
    }
}

//! Typed state slices for the known state categories.
//!
//! Every slice converts to and from the JSON map form observers exchange with
//! the manager. A failed `from_map` doubles as a schema check.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{JsonMap, StateKey};

pub trait StateSlice: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn state_key() -> StateKey;

    fn to_map(&self) -> Result<JsonMap, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "state slice serialized to a non-object value: {other}"
            ))),
        }
    }

    fn from_map(map: &JsonMap) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSlice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl StateSlice for SessionSlice {
    fn state_key() -> StateKey {
        StateKey::Session
    }
}

/// Route stack. Stored in the top-level `currentRoute`/`navigationStack`
/// fields of the composite memento, so it has no free-form part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSlice {
    #[serde(default)]
    pub current_route: Option<String>,
    #[serde(default)]
    pub navigation_stack: Vec<String>,
}

impl NavigationSlice {
    pub fn is_empty(&self) -> bool {
        self.current_route.is_none() && self.navigation_stack.is_empty()
    }
}

impl StateSlice for NavigationSlice {
    fn state_key() -> StateKey {
        StateKey::Navigation
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSlice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_tab: Option<String>,
    #[serde(default)]
    pub scroll_positions: BTreeMap<String, f64>,
    #[serde(default)]
    pub form_data: JsonMap,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl StateSlice for UiSlice {
    fn state_key() -> StateKey {
        StateKey::Ui
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSlice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_category: Option<String>,
    #[serde(default)]
    pub completed_patterns: Vec<String>,
    /// Completion ratio per pattern, 0.0..=1.0
    #[serde(default)]
    pub progress: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl StateSlice for PatternSlice {
    fn state_key() -> StateKey {
        StateKey::Patterns
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSlice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default = "default_sound_enabled")]
    pub sound_enabled: bool,
    #[serde(flatten)]
    pub extra: JsonMap,
}

fn default_sound_enabled() -> bool {
    true
}

impl Default for ConfigSlice {
    fn default() -> Self {
        Self {
            language: None,
            theme: None,
            sound_enabled: default_sound_enabled(),
            extra: JsonMap::new(),
        }
    }
}

impl StateSlice for ConfigSlice {
    fn state_key() -> StateKey {
        StateKey::Config
    }
}

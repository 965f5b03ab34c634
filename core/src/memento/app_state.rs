//! Composite application snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use super::contract::{age_at, StateMemento};
use super::slices::{NavigationSlice, StateSlice};
use super::{JsonMap, StateKey, MEMENTO_STATE_VERSION};
use crate::event::LifecyclePhase;

/// Snapshot of the whole application, folded from every observer's slice.
///
/// Each sub-map belongs to exactly one category of observer. Nothing in this
/// crate looks inside a sub-map beyond routing it by [`StateKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStateMemento {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub lifecycle_state: LifecyclePhase,
    #[serde(default = "default_originator")]
    pub originator_id: String,
    #[serde(default = "default_state_version")]
    pub state_version: String,
    #[serde(default)]
    pub current_route: Option<String>,
    #[serde(default)]
    pub navigation_stack: Vec<String>,
    #[serde(default)]
    pub user_session: JsonMap,
    #[serde(default)]
    pub ui_state: JsonMap,
    #[serde(default)]
    pub pattern_states: JsonMap,
    #[serde(default)]
    pub app_config: JsonMap,
    #[serde(default)]
    pub background_tasks: JsonMap,
    #[serde(default)]
    pub network_states: JsonMap,
    #[serde(default)]
    pub animation_states: JsonMap,
    #[serde(default)]
    pub firebase_state: JsonMap,
    #[serde(default)]
    pub localization_state: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_state: Option<JsonMap>,
    /// Component slices keyed by custom state key name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_states: BTreeMap<String, JsonMap>,
}

fn default_originator() -> String {
    "app".to_string()
}

fn default_state_version() -> String {
    MEMENTO_STATE_VERSION.to_string()
}

impl AppStateMemento {
    pub fn new(lifecycle_state: LifecyclePhase) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            lifecycle_state,
            originator_id: default_originator(),
            state_version: default_state_version(),
            current_route: None,
            navigation_stack: Vec::new(),
            user_session: JsonMap::new(),
            ui_state: JsonMap::new(),
            pattern_states: JsonMap::new(),
            app_config: JsonMap::new(),
            background_tasks: JsonMap::new(),
            network_states: JsonMap::new(),
            animation_states: JsonMap::new(),
            firebase_state: JsonMap::new(),
            localization_state: JsonMap::new(),
            game_state: None,
            custom_states: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_originator(mut self, originator_id: impl Into<String>) -> Self {
        self.originator_id = originator_id.into();
        self
    }

    /// Combine two snapshots.
    ///
    /// Sub-maps are shallow-unioned with `other` winning on key conflicts.
    /// Scalar fields (id, route, navigation stack, lifecycle state,
    /// originator) come from `other` unconditionally; the timestamp is the
    /// later of the two.
    pub fn merge_with(&self, other: &AppStateMemento) -> AppStateMemento {
        AppStateMemento {
            id: other.id.clone(),
            timestamp: self.timestamp.max(other.timestamp),
            lifecycle_state: other.lifecycle_state,
            originator_id: other.originator_id.clone(),
            state_version: other.state_version.clone(),
            current_route: other.current_route.clone(),
            navigation_stack: other.navigation_stack.clone(),
            user_session: union(&self.user_session, &other.user_session),
            ui_state: union(&self.ui_state, &other.ui_state),
            pattern_states: union(&self.pattern_states, &other.pattern_states),
            app_config: union(&self.app_config, &other.app_config),
            background_tasks: union(&self.background_tasks, &other.background_tasks),
            network_states: union(&self.network_states, &other.network_states),
            animation_states: union(&self.animation_states, &other.animation_states),
            firebase_state: union(&self.firebase_state, &other.firebase_state),
            localization_state: union(&self.localization_state, &other.localization_state),
            game_state: match (&self.game_state, &other.game_state) {
                (Some(a), Some(b)) => Some(union(a, b)),
                (a, b) => b.clone().or_else(|| a.clone()),
            },
            custom_states: {
                let mut out = self.custom_states.clone();
                for (name, slice) in &other.custom_states {
                    let merged = match out.get(name) {
                        Some(base) => union(base, slice),
                        None => slice.clone(),
                    };
                    out.insert(name.clone(), merged);
                }
                out
            },
        }
    }

    /// Route an observer slice into the part of the snapshot `key` owns.
    ///
    /// Keys already present are overwritten. Only a navigation slice can fail,
    /// because it is parsed into the typed route fields.
    pub fn apply_slice(&mut self, key: &StateKey, slice: JsonMap) -> Result<(), serde_json::Error> {
        match key {
            StateKey::Navigation => {
                let nav = NavigationSlice::from_map(&slice)?;
                self.current_route = nav.current_route;
                self.navigation_stack = nav.navigation_stack;
            }
            StateKey::Game => {
                let target = self.game_state.get_or_insert_with(JsonMap::new);
                target.extend(slice);
            }
            StateKey::Custom(name) => {
                self.custom_states
                    .entry(name.clone())
                    .or_default()
                    .extend(slice);
            }
            known => {
                if let Some(target) = self.sub_map_mut(known) {
                    target.extend(slice);
                }
            }
        }
        Ok(())
    }

    /// The slice `key` owns, or `None` when nothing was captured for it.
    pub fn slice(&self, key: &StateKey) -> Option<JsonMap> {
        match key {
            StateKey::Navigation => {
                let nav = NavigationSlice {
                    current_route: self.current_route.clone(),
                    navigation_stack: self.navigation_stack.clone(),
                };
                if nav.is_empty() {
                    None
                } else {
                    nav.to_map().ok()
                }
            }
            StateKey::Game => self.game_state.clone().filter(|m| !m.is_empty()),
            StateKey::Custom(name) => self
                .custom_states
                .get(name.as_str())
                .filter(|m| !m.is_empty())
                .cloned(),
            known => self.sub_map(known).filter(|m| !m.is_empty()).cloned(),
        }
    }

    pub fn sub_map(&self, key: &StateKey) -> Option<&JsonMap> {
        match key {
            StateKey::Session => Some(&self.user_session),
            StateKey::Ui => Some(&self.ui_state),
            StateKey::Patterns => Some(&self.pattern_states),
            StateKey::Config => Some(&self.app_config),
            StateKey::BackgroundTasks => Some(&self.background_tasks),
            StateKey::Network => Some(&self.network_states),
            StateKey::Animation => Some(&self.animation_states),
            StateKey::Firebase => Some(&self.firebase_state),
            StateKey::Localization => Some(&self.localization_state),
            StateKey::Game => self.game_state.as_ref(),
            StateKey::Navigation | StateKey::Custom(_) => None,
        }
    }

    fn sub_map_mut(&mut self, key: &StateKey) -> Option<&mut JsonMap> {
        match key {
            StateKey::Session => Some(&mut self.user_session),
            StateKey::Ui => Some(&mut self.ui_state),
            StateKey::Patterns => Some(&mut self.pattern_states),
            StateKey::Config => Some(&mut self.app_config),
            StateKey::BackgroundTasks => Some(&mut self.background_tasks),
            StateKey::Network => Some(&mut self.network_states),
            StateKey::Animation => Some(&mut self.animation_states),
            StateKey::Firebase => Some(&mut self.firebase_state),
            StateKey::Localization => Some(&mut self.localization_state),
            StateKey::Game => self.game_state.as_mut(),
            StateKey::Navigation | StateKey::Custom(_) => None,
        }
    }

    /// True when no observer contributed anything.
    pub fn is_empty(&self) -> bool {
        self.current_route.is_none()
            && self.navigation_stack.is_empty()
            && self.user_session.is_empty()
            && self.ui_state.is_empty()
            && self.pattern_states.is_empty()
            && self.app_config.is_empty()
            && self.background_tasks.is_empty()
            && self.network_states.is_empty()
            && self.animation_states.is_empty()
            && self.firebase_state.is_empty()
            && self.localization_state.is_empty()
            && self.game_state.as_ref().map_or(true, |m| m.is_empty())
            && self.custom_states.values().all(|m| m.is_empty())
    }

    pub fn age(&self) -> Duration {
        age_at(self.timestamp, Utc::now())
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.is_stale_at(max_age, Utc::now())
    }

    pub fn is_stale_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        age_at(self.timestamp, now) > max_age
    }

    pub fn to_map(&self) -> Result<JsonMap, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(<serde_json::Error as serde::ser::Error>::custom(
                "memento serialized to a non-object value",
            )),
        }
    }

    pub fn from_map(map: JsonMap) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map))
    }
}

impl StateMemento for AppStateMemento {
    fn memento_id(&self) -> &str {
        &self.id
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
        AppStateMemento::to_map(self)
    }
}

fn union(base: &JsonMap, overlay: &JsonMap) -> JsonMap {
    let mut out = base.clone();
    for (k, v) in overlay {
        out.insert(k.clone(), v.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(v: Value) -> JsonMap {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_precedence() {
        let mut a = AppStateMemento::new(LifecyclePhase::Paused);
        a.user_session = obj(json!({"uid": "u1", "token": "t1"}));
        a.app_config = obj(json!({"theme": "dark"}));
        a.current_route = Some("/home".into());

        let mut b = AppStateMemento::new(LifecyclePhase::Resumed)
            .with_timestamp(a.timestamp - chrono::Duration::seconds(10));
        b.user_session = obj(json!({"uid": "u2"}));

        let merged = a.merge_with(&b);
        assert_eq!(merged.user_session["uid"], "u2");
        assert_eq!(merged.user_session["token"], "t1");
        assert_eq!(merged.app_config["theme"], "dark");
        // scalars always come from `other`
        assert_eq!(merged.current_route, None);
        assert_eq!(merged.lifecycle_state, LifecyclePhase::Resumed);
        assert_eq!(merged.id, b.id);
        // later timestamp wins
        assert_eq!(merged.timestamp, a.timestamp);
    }

    #[test]
    fn test_merge_game_state() {
        let mut a = AppStateMemento::new(LifecyclePhase::Paused);
        a.game_state = Some(obj(json!({"wave": 3, "gold": 10})));
        let b = AppStateMemento::new(LifecyclePhase::Paused);
        assert_eq!(a.merge_with(&b).game_state, a.game_state);

        let mut c = AppStateMemento::new(LifecyclePhase::Paused);
        c.game_state = Some(obj(json!({"wave": 4})));
        let merged = a.merge_with(&c).game_state.unwrap();
        assert_eq!(merged["wave"], 4);
        assert_eq!(merged["gold"], 10);
    }

    #[test]
    fn test_apply_and_read_slices() {
        let mut m = AppStateMemento::new(LifecyclePhase::Paused);
        m.apply_slice(&StateKey::Session, obj(json!({"uid": "u1"})))
            .unwrap();
        m.apply_slice(
            &StateKey::Navigation,
            obj(json!({
                "currentRoute": "/level/2",
                "navigationStack": ["/", "/levels", "/level/2"]
            })),
        )
        .unwrap();
        m.apply_slice(&StateKey::custom("form.signup"), obj(json!({"email": "a@b.c"})))
            .unwrap();

        assert_eq!(m.user_session["uid"], "u1");
        assert_eq!(m.current_route.as_deref(), Some("/level/2"));
        assert_eq!(m.navigation_stack.len(), 3);
        assert_eq!(m.custom_states["form.signup"]["email"], "a@b.c");
        assert!(m.ui_state.is_empty());

        let nav = m.slice(&StateKey::Navigation).unwrap();
        assert_eq!(nav["currentRoute"], "/level/2");
        let form = m.slice(&StateKey::custom("form.signup")).unwrap();
        assert_eq!(form["email"], "a@b.c");
        assert!(m.slice(&StateKey::Patterns).is_none());
        assert!(m.slice(&StateKey::Game).is_none());
    }

    #[test]
    fn test_ui_and_custom_slices_stay_apart() {
        let mut m = AppStateMemento::new(LifecyclePhase::Paused);
        m.apply_slice(&StateKey::custom("signupForm"), obj(json!({"email": "a@b.c"})))
            .unwrap();
        m.apply_slice(&StateKey::Ui, obj(json!({"signupForm": "tab-2"})))
            .unwrap();

        assert_eq!(
            m.slice(&StateKey::Ui),
            Some(obj(json!({"signupForm": "tab-2"})))
        );
        assert_eq!(
            m.slice(&StateKey::custom("signupForm")),
            Some(obj(json!({"email": "a@b.c"})))
        );

        let back = AppStateMemento::from_map(m.to_map().unwrap()).unwrap();
        assert_eq!(back, m);
        assert!(back.to_map().unwrap().contains_key("customStates"));
    }

    #[test]
    fn test_merge_custom_states() {
        let mut a = AppStateMemento::new(LifecyclePhase::Paused);
        a.apply_slice(&StateKey::custom("form"), obj(json!({"email": "a@b.c", "step": 1})))
            .unwrap();
        a.apply_slice(&StateKey::custom("scroll"), obj(json!({"y": 40})))
            .unwrap();
        let mut b = AppStateMemento::new(LifecyclePhase::Paused);
        b.apply_slice(&StateKey::custom("form"), obj(json!({"step": 2})))
            .unwrap();

        let merged = a.merge_with(&b);
        assert_eq!(merged.custom_states["form"], obj(json!({"email": "a@b.c", "step": 2})));
        assert_eq!(merged.custom_states["scroll"]["y"], 40);
    }

    #[test]
    fn test_bad_navigation_slice_is_rejected() {
        let mut m = AppStateMemento::new(LifecyclePhase::Paused);
        let err = m.apply_slice(&StateKey::Navigation, obj(json!({"navigationStack": 7})));
        assert!(err.is_err());
        assert!(m.is_empty());
    }

    #[test]
    fn test_map_round_trip() {
        let mut m = AppStateMemento::new(LifecyclePhase::Paused).with_originator("user");
        m.pattern_states = obj(json!({"observer": {"progress": 0.5}}));
        m.game_state = Some(obj(json!({"wave": 2})));
        m.navigation_stack = vec!["/".into(), "/patterns".into()];

        let map = m.to_map().unwrap();
        assert_eq!(map["lifecycleState"], "paused");
        assert!(map.contains_key("patternStates"));
        let back = AppStateMemento::from_map(map).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_staleness_after_five_minutes() {
        let fresh = AppStateMemento::new(LifecyclePhase::Paused);
        let five = Duration::from_secs(5 * 60);
        assert!(!fresh.is_stale(five));
        let later = fresh.timestamp + chrono::Duration::minutes(5) + chrono::Duration::seconds(1);
        assert!(fresh.is_stale_at(five, later));

        let reread = AppStateMemento::from_map(fresh.to_map().unwrap()).unwrap();
        assert!(reread.is_stale_at(five, later));
    }
}

//! # State mementos
//!
//! `AppStateMemento` is the composite snapshot persisted by the repository.
//! Observers contribute slices of it, routed by [`StateKey`]; the typed
//! slices in [`slices`] give each known category a schema while keeping an
//! `extra` map for free-form fields.

pub mod app_state;
pub mod contract;
pub mod key;
pub mod slices;

pub use app_state::AppStateMemento;
pub use contract::{
    ComponentMemento, ConfigMemento, NavigationMemento, PatternMemento, SessionMemento,
    StateMemento, UiMemento,
};
pub use key::StateKey;
pub use slices::{ConfigSlice, NavigationSlice, PatternSlice, SessionSlice, StateSlice, UiSlice};

/// Free-form JSON object used for every state payload.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Version tag written into every memento.
pub const MEMENTO_STATE_VERSION: &str = "1.0.0";

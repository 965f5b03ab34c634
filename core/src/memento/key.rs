use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Routing key tying an observer to the slice of the composite memento it owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKey {
    Session,
    Navigation,
    Ui,
    Patterns,
    Config,
    BackgroundTasks,
    Network,
    Animation,
    Firebase,
    Localization,
    Game,
    /// Component-specific slice stored under `customStates[name]`.
    Custom(String),
}

impl StateKey {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::parse(&name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Session => "session",
            Self::Navigation => "navigation",
            Self::Ui => "ui",
            Self::Patterns => "patterns",
            Self::Config => "config",
            Self::BackgroundTasks => "backgroundTasks",
            Self::Network => "network",
            Self::Animation => "animation",
            Self::Firebase => "firebase",
            Self::Localization => "localization",
            Self::Game => "game",
            Self::Custom(name) => name,
        }
    }

    /// Known names map to their variant, anything else becomes `Custom`.
    pub fn parse(s: &str) -> Self {
        match s {
            "session" => Self::Session,
            "navigation" => Self::Navigation,
            "ui" => Self::Ui,
            "patterns" => Self::Patterns,
            "config" => Self::Config,
            "backgroundTasks" => Self::BackgroundTasks,
            "network" => Self::Network,
            "animation" => Self::Animation,
            "firebase" => Self::Firebase,
            "localization" => Self::Localization,
            "game" => Self::Game,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

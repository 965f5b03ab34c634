//! Lifecycle enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host application lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecyclePhase {
    /// Visible and receiving input
    Resumed,
    /// Visible but not receiving input
    Inactive,
    /// Not visible, running in the background
    Paused,
    /// Detached from any host view, about to terminate
    Detached,
    /// All views hidden
    Hidden,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resumed => "resumed",
            Self::Inactive => "inactive",
            Self::Paused => "paused",
            Self::Detached => "detached",
            Self::Hidden => "hidden",
        }
    }

    /// Phases from which a return to `Resumed` counts as foregrounding.
    pub fn is_backgrounded(&self) -> bool {
        matches!(self, Self::Paused | Self::Detached)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LifecyclePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resumed" => Ok(Self::Resumed),
            "inactive" => Ok(Self::Inactive),
            "paused" => Ok(Self::Paused),
            "detached" => Ok(Self::Detached),
            "hidden" => Ok(Self::Hidden),
            other => Err(format!("unknown lifecycle phase: {other}")),
        }
    }
}

/// Kind of lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleEventType {
    StateChange,
    Backgrounding,
    Foregrounding,
    Terminating,
    ManualSave,
    LowMemory,
    ConnectivityChange,
    BatteryChange,
    OrientationChange,
}

impl LifecycleEventType {
    /// Whether events of this type trigger a state capture.
    pub fn persists_state(&self) -> bool {
        matches!(
            self,
            Self::Backgrounding | Self::Terminating | Self::ManualSave | Self::LowMemory
        )
    }

    pub fn default_priority(&self) -> EventPriority {
        match self {
            Self::Backgrounding | Self::Foregrounding | Self::LowMemory => EventPriority::High,
            Self::Terminating => EventPriority::Critical,
            Self::ManualSave | Self::ConnectivityChange | Self::BatteryChange => {
                EventPriority::Medium
            }
            Self::OrientationChange | Self::StateChange => EventPriority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateChange => "stateChange",
            Self::Backgrounding => "backgrounding",
            Self::Foregrounding => "foregrounding",
            Self::Terminating => "terminating",
            Self::ManualSave => "manualSave",
            Self::LowMemory => "lowMemory",
            Self::ConnectivityChange => "connectivityChange",
            Self::BatteryChange => "batteryChange",
            Self::OrientationChange => "orientationChange",
        }
    }
}

impl fmt::Display for LifecycleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch priority. Ordering is `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for EventPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Where an event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventSource {
    System,
    User,
    Application,
    Network,
    Device,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Application => "application",
            Self::Network => "network",
            Self::Device => "device",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_table() {
        assert!(LifecycleEventType::Backgrounding.persists_state());
        assert!(LifecycleEventType::Terminating.persists_state());
        assert!(LifecycleEventType::ManualSave.persists_state());
        assert!(LifecycleEventType::LowMemory.persists_state());
        assert!(!LifecycleEventType::Foregrounding.persists_state());
        assert!(!LifecycleEventType::ConnectivityChange.persists_state());
        assert!(!LifecycleEventType::OrientationChange.persists_state());
    }

    #[test]
    fn test_default_priorities() {
        assert_eq!(
            LifecycleEventType::Terminating.default_priority(),
            EventPriority::Critical
        );
        assert_eq!(
            LifecycleEventType::ManualSave.default_priority(),
            EventPriority::Medium
        );
        assert_eq!(
            LifecycleEventType::OrientationChange.default_priority(),
            EventPriority::Low
        );
    }

    #[test]
    fn test_priority_ordering() {
        assert!(EventPriority::Critical > EventPriority::High);
        assert!(EventPriority::High > EventPriority::Medium);
        assert!(EventPriority::Medium > EventPriority::Low);
    }

    #[test]
    fn test_phase_parse() {
        assert_eq!("Paused".parse::<LifecyclePhase>(), Ok(LifecyclePhase::Paused));
        assert!("sleeping".parse::<LifecyclePhase>().is_err());
    }
}

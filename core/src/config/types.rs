use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::repository::DEFAULT_COMPRESSION_THRESHOLD;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub events_out: EventsOutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "statekeep_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_repository_provider")]
    #[serde(flatten)]
    pub provider: RepositoryProvider,

    /// Serialized records larger than this are compressed.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum RepositoryProvider {
    #[serde(rename = "file")]
    File(FileRepositoryConfig),
    #[serde(rename = "memory")]
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRepositoryConfig {
    /// Storage directory. Empty means `<data dir>/mementos`.
    #[serde(default)]
    pub directory: String,

    /// Keep at most this many records, pruning the oldest. 0 keeps all.
    #[serde(default = "default_max_mementos")]
    pub max_mementos: usize,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_repository_provider() -> RepositoryProvider {
    RepositoryProvider::File(FileRepositoryConfig::default())
}

fn default_compression_threshold() -> usize {
    DEFAULT_COMPRESSION_THRESHOLD
}

fn default_max_mementos() -> usize {
    20
}

fn default_cache_capacity() -> usize {
    16
}

impl Default for FileRepositoryConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            max_mementos: default_max_mementos(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            provider: default_repository_provider(),
            compression_threshold_bytes: default_compression_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Upper bound for a single repository call made during a cycle.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,

    /// Mementos older than this are not restored. 0 disables the check.
    #[serde(default = "default_restore_max_age_secs")]
    pub restore_max_age_secs: u64,

    /// Fold each new capture over the latest stored memento, so slices of
    /// observers that are not registered right now survive.
    #[serde(default)]
    pub merge_previous: bool,

    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_io_timeout_ms() -> u64 {
    500
}

fn default_restore_max_age_secs() -> u64 {
    24 * 60 * 60
}

fn default_event_channel_capacity() -> usize {
    256
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            io_timeout_ms: default_io_timeout_ms(),
            restore_max_age_secs: default_restore_max_age_secs(),
            merge_previous: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl LifecycleConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn restore_max_age(&self) -> Option<Duration> {
        (self.restore_max_age_secs > 0).then(|| Duration::from_secs(self.restore_max_age_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsOutConfig {
    /// Append lifecycle telemetry as JSON lines to `path` ("stdout:" for stdout).
    pub enabled: bool,
    pub path: String,
    pub channel_capacity: usize,
    pub drop_when_full: bool,
}

impl Default for EventsOutConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "./lifecycle.events.jsonl".to_string(),
            channel_capacity: 2048,
            drop_when_full: true,
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Memento repository errors.
///
/// A missing memento is not an error: lookups return `Ok(None)`.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("repository is not initialized")]
    NotInitialized,

    #[error("invalid memento id: {0:?}")]
    InvalidId(String),

    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record codec failed: {0}")]
    Codec(String),

    #[error("repository operation timed out after {0}ms")]
    Timeout(u64),

    #[error("repository task aborted: {0}")]
    Aborted(String),
}

impl RepositoryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable kind, used as the `error.kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotInitialized => "repository.not_initialized",
            Self::InvalidId(_) => "repository.invalid_id",
            Self::Io { .. } => "repository.io",
            Self::Serialization(_) => "repository.serialization",
            Self::Codec(_) => "repository.codec",
            Self::Timeout(_) => "repository.timeout",
            Self::Aborted(_) => "repository.aborted",
        }
    }
}

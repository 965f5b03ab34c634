use thiserror::Error;

use super::repository::RepositoryError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Errors surfaced by the lifecycle manager's public operations.
///
/// Repository failures that happen inside a capture or restore cycle are
/// logged and reported in the cycle report instead of being returned here.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("lifecycle manager is not initialized")]
    NotInitialized,
    #[error("lifecycle manager has been disposed")]
    Disposed,
    #[error("repository failure: {0}")]
    Repository(#[from] RepositoryError),
}

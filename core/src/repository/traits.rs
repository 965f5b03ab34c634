use async_trait::async_trait;

use super::stats::RepositoryStatistics;
use crate::error::RepositoryError;
use crate::memento::AppStateMemento;

/// Storage of composite mementos keyed by id.
///
/// Every operation other than `initialize` fails with
/// [`RepositoryError::NotInitialized`] until `initialize` has succeeded, and
/// again after `dispose`. A missing id is `Ok(None)`, never an error.
#[async_trait]
pub trait MementoRepository: Send + Sync {
    fn name(&self) -> &str;

    /// Idempotent. Creates the backing storage when it does not exist.
    async fn initialize(&self) -> Result<(), RepositoryError>;

    async fn is_initialized(&self) -> bool;

    /// Stores `memento`, replacing any record with the same id.
    async fn save_memento(&self, memento: &AppStateMemento) -> Result<(), RepositoryError>;

    /// The memento with the greatest timestamp, regardless of insertion order.
    async fn get_latest_memento(&self) -> Result<Option<AppStateMemento>, RepositoryError>;

    async fn get_memento_by_id(&self, id: &str)
        -> Result<Option<AppStateMemento>, RepositoryError>;

    /// All readable mementos in ascending timestamp order. Unreadable records
    /// are skipped and logged.
    async fn get_all_mementos(&self) -> Result<Vec<AppStateMemento>, RepositoryError>;

    /// Returns whether a record existed.
    async fn delete_memento(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Returns the number of records removed.
    async fn clear_all_mementos(&self) -> Result<usize, RepositoryError>;

    async fn get_statistics(&self) -> Result<RepositoryStatistics, RepositoryError>;

    async fn dispose(&self) -> Result<(), RepositoryError>;
}

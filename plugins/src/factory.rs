use std::path::PathBuf;
use std::sync::Arc;

use statekeep_core::config::{get_statekeep_data_dir, RepositoryConfig, RepositoryProvider};
use statekeep_core::context::RepositoryFactory;
use statekeep_core::error::RepositoryError;
use statekeep_core::repository::{InMemoryRepository, MementoRepository};

use crate::repository::FileMementoRepository;

/// Resolve the storage directory; empty means `<data dir>/mementos`.
fn resolve_directory(directory: &str) -> PathBuf {
    if !directory.trim().is_empty() {
        return PathBuf::from(directory);
    }
    match get_statekeep_data_dir() {
        Ok(dir) => dir.join("mementos"),
        Err(e) => {
            tracing::warn!(error.message = %e, "data dir unavailable, using ./.statekeep/mementos");
            PathBuf::from(".statekeep").join("mementos")
        }
    }
}

pub fn build_repository(cfg: &RepositoryConfig) -> Arc<dyn MementoRepository> {
    match &cfg.provider {
        RepositoryProvider::File(file_cfg) => Arc::new(FileMementoRepository::from_config(
            resolve_directory(&file_cfg.directory),
            file_cfg,
            cfg.compression_threshold_bytes,
        )),
        RepositoryProvider::Memory => Arc::new(InMemoryRepository::with_threshold(
            cfg.compression_threshold_bytes,
        )),
    }
}

/// [`RepositoryFactory`] over the backends shipped in this crate.
pub struct StandardRepositoryFactory;

#[async_trait::async_trait]
impl RepositoryFactory for StandardRepositoryFactory {
    async fn build_repository(
        &self,
        cfg: &RepositoryConfig,
    ) -> Result<Arc<dyn MementoRepository>, RepositoryError> {
        Ok(build_repository(cfg))
    }
}

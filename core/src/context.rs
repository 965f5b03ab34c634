use crate::config::{AppConfig, RepositoryConfig};
use crate::error::{CliError, RepositoryError};
use crate::events_out::{start_events_out, EventsOutTx};
use crate::lifecycle::LifecycleManager;
use crate::repository::MementoRepository;
use std::sync::Arc;

/// Builds the repository backend selected in config.
#[async_trait::async_trait]
pub trait RepositoryFactory: Send + Sync {
    async fn build_repository(
        &self,
        cfg: &RepositoryConfig,
    ) -> Result<Arc<dyn MementoRepository>, RepositoryError>;
}

#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    events_out: Option<EventsOutTx>,
    manager: LifecycleManager,
}

impl AppContext {
    pub async fn new(
        cfg: AppConfig,
        factory: Arc<dyn RepositoryFactory>,
    ) -> Result<Self, CliError> {
        let repository = factory.build_repository(&cfg.repository).await?;
        Self::with_repository(cfg, repository).await
    }

    pub async fn with_repository(
        cfg: AppConfig,
        repository: Arc<dyn MementoRepository>,
    ) -> Result<Self, CliError> {
        let events_out = start_events_out(&cfg.events_out)
            .await
            .map_err(CliError::Config)?;
        let manager = LifecycleManager::with_events_out(
            repository,
            cfg.lifecycle.clone(),
            events_out.clone(),
        );
        Ok(Self {
            cfg,
            events_out,
            manager,
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn events_out(&self) -> Option<EventsOutTx> {
        self.events_out.clone()
    }

    pub fn manager(&self) -> &LifecycleManager {
        &self.manager
    }

    pub fn repository(&self) -> Arc<dyn MementoRepository> {
        self.manager.repository()
    }
}

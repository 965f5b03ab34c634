//! In-memory repository. Same contract as the file-backed one, nothing
//! survives the process.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::codec::{
    decode_record, encode_record, validate_memento_id, RecordMeta, DEFAULT_COMPRESSION_THRESHOLD,
};
use super::stats::{latest_record, sorted_records, RepositoryStatistics};
use super::traits::MementoRepository;
use crate::error::RepositoryError;
use crate::memento::AppStateMemento;

struct StoredRecord {
    meta: RecordMeta,
    bytes: Vec<u8>,
}

pub struct InMemoryRepository {
    compression_threshold: usize,
    /// `None` until initialized and after dispose.
    records: RwLock<Option<HashMap<String, StoredRecord>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_COMPRESSION_THRESHOLD)
    }

    pub fn with_threshold(compression_threshold: usize) -> Self {
        Self {
            compression_threshold,
            records: RwLock::new(None),
        }
    }

    /// Stored bytes for `id`, exactly as the codec produced them.
    pub async fn raw_record(&self, id: &str) -> Option<Vec<u8>> {
        self.records
            .read()
            .await
            .as_ref()
            .and_then(|r| r.get(id).map(|s| s.bytes.clone()))
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_logged(stored: &StoredRecord) -> Option<AppStateMemento> {
    match decode_record(&stored.bytes) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(
                memento_id = %stored.meta.id,
                error.kind = e.kind(),
                error.message = %e,
                "skipping unreadable memento"
            );
            None
        }
    }
}

#[async_trait]
impl MementoRepository for InMemoryRepository {
    fn name(&self) -> &str {
        "memory"
    }

    async fn initialize(&self) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if records.is_none() {
            *records = Some(HashMap::new());
            tracing::debug!(repository = "memory", "repository initialized");
        }
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        self.records.read().await.is_some()
    }

    async fn save_memento(&self, memento: &AppStateMemento) -> Result<(), RepositoryError> {
        let mut guard = self.records.write().await;
        let records = guard.as_mut().ok_or(RepositoryError::NotInitialized)?;
        validate_memento_id(&memento.id)?;

        let record = encode_record(memento, self.compression_threshold)?;
        let meta = RecordMeta::new(memento, &record);
        tracing::debug!(
            memento_id = %meta.id,
            size = meta.size_bytes,
            compressed = meta.compressed,
            "memento saved"
        );
        records.insert(
            memento.id.clone(),
            StoredRecord {
                meta,
                bytes: record.bytes,
            },
        );
        Ok(())
    }

    async fn get_latest_memento(&self) -> Result<Option<AppStateMemento>, RepositoryError> {
        let guard = self.records.read().await;
        let records = guard.as_ref().ok_or(RepositoryError::NotInitialized)?;
        let Some(latest) = latest_record(records.values().map(|s| &s.meta)) else {
            return Ok(None);
        };
        let stored = &records[&latest.id];
        Ok(Some(decode_record(&stored.bytes)?))
    }

    async fn get_memento_by_id(
        &self,
        id: &str,
    ) -> Result<Option<AppStateMemento>, RepositoryError> {
        let guard = self.records.read().await;
        let records = guard.as_ref().ok_or(RepositoryError::NotInitialized)?;
        match records.get(id) {
            Some(stored) => Ok(Some(decode_record(&stored.bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_all_mementos(&self) -> Result<Vec<AppStateMemento>, RepositoryError> {
        let guard = self.records.read().await;
        let records = guard.as_ref().ok_or(RepositoryError::NotInitialized)?;
        Ok(sorted_records(records.values().map(|s| &s.meta))
            .into_iter()
            .filter_map(|meta| decode_logged(&records[&meta.id]))
            .collect())
    }

    async fn delete_memento(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut guard = self.records.write().await;
        let records = guard.as_mut().ok_or(RepositoryError::NotInitialized)?;
        Ok(records.remove(id).is_some())
    }

    async fn clear_all_mementos(&self) -> Result<usize, RepositoryError> {
        let mut guard = self.records.write().await;
        let records = guard.as_mut().ok_or(RepositoryError::NotInitialized)?;
        let count = records.len();
        records.clear();
        Ok(count)
    }

    async fn get_statistics(&self) -> Result<RepositoryStatistics, RepositoryError> {
        let guard = self.records.read().await;
        let records = guard.as_ref().ok_or(RepositoryError::NotInitialized)?;
        Ok(RepositoryStatistics::from_records(
            records.values().map(|s| &s.meta),
            Utc::now(),
        ))
    }

    async fn dispose(&self) -> Result<(), RepositoryError> {
        *self.records.write().await = None;
        Ok(())
    }
}

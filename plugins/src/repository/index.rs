//! `index.json`: metadata for every stored record, keyed by memento id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use statekeep_core::error::RepositoryError;
use statekeep_core::repository::RecordMeta;

const INDEX_VERSION: u32 = 1;

fn default_index_version() -> u32 {
    INDEX_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MementoIndex {
    #[serde(default = "default_index_version")]
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, RecordMeta>,
}

impl Default for MementoIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl MementoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Ok(None)` when the file does not exist; a file that does not parse is
    /// an error so the caller can rebuild.
    pub async fn load(path: &Path) -> Result<Option<Self>, RepositoryError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RepositoryError::io(path, e)),
        };
        let index: Self = serde_json::from_slice(&bytes)?;
        Ok(Some(index))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RepositoryError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn insert(&mut self, meta: RecordMeta) -> Option<RecordMeta> {
        self.entries.insert(meta.id.clone(), meta)
    }

    pub fn remove(&mut self, id: &str) -> Option<RecordMeta> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&RecordMeta> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordMeta> {
        self.entries.values()
    }
}

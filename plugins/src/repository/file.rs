//! File-backed memento repository.
//!
//! Layout under the configured directory:
//!
//! ```text
//! memento_<id>.json   one encoded record per memento
//! index.json          id -> record metadata
//! statistics.json     statistics as of the last write
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place.

use async_trait::async_trait;
use chrono::Utc;
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use statekeep_core::config::FileRepositoryConfig;
use statekeep_core::error::RepositoryError;
use statekeep_core::memento::AppStateMemento;
use statekeep_core::repository::stats::sorted_records;
use statekeep_core::repository::{
    decode_record, encode_record, is_compressed_record, validate_memento_id, MementoRepository,
    RecordMeta, RepositoryStatistics, DEFAULT_COMPRESSION_THRESHOLD,
};

use super::index::MementoIndex;

const RECORD_PREFIX: &str = "memento_";
const RECORD_SUFFIX: &str = ".json";
const INDEX_FILE: &str = "index.json";
const STATISTICS_FILE: &str = "statistics.json";
const DEFAULT_CACHE_CAPACITY: usize = 16;

struct FileState {
    index: MementoIndex,
    cache: LruCache<String, AppStateMemento>,
}

pub struct FileMementoRepository {
    directory: PathBuf,
    compression_threshold: usize,
    /// 0 keeps everything.
    max_mementos: usize,
    cache_capacity: NonZeroUsize,
    state: Mutex<Option<FileState>>,
}

impl FileMementoRepository {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            max_mementos: 0,
            cache_capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            state: Mutex::new(None),
        }
    }

    pub fn from_config(
        directory: impl Into<PathBuf>,
        cfg: &FileRepositoryConfig,
        compression_threshold: usize,
    ) -> Self {
        Self::new(directory)
            .with_compression_threshold(compression_threshold)
            .with_max_mementos(cfg.max_mementos)
            .with_cache_capacity(cfg.cache_capacity)
    }

    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    pub fn with_max_mementos(mut self, max_mementos: usize) -> Self {
        self.max_mementos = max_mementos;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.directory
            .join(format!("{RECORD_PREFIX}{id}{RECORD_SUFFIX}"))
    }

    fn index_path(&self) -> PathBuf {
        self.directory.join(INDEX_FILE)
    }

    fn statistics_path(&self) -> PathBuf {
        self.directory.join(STATISTICS_FILE)
    }

    /// `(id, path)` of every `memento_<id>.json` in the directory.
    async fn record_files(&self) -> Result<Vec<(String, PathBuf)>, RepositoryError> {
        let mut files = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(|e| RepositoryError::io(&self.directory, e))?;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| RepositoryError::io(&self.directory, e))?
        {
            let path = entry.path();
            let Some(file_id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(RECORD_PREFIX))
                .and_then(|n| n.strip_suffix(RECORD_SUFFIX))
                .map(str::to_string)
            else {
                continue;
            };
            files.push((file_id, path));
        }
        Ok(files)
    }

    /// Scan the record files and index every one that decodes.
    async fn rebuild_index(&self) -> Result<MementoIndex, RepositoryError> {
        let mut index = MementoIndex::new();
        for (file_id, path) in self.record_files().await? {
            if let Some(meta) = scan_record(&path, &file_id).await {
                index.insert(meta);
            }
        }

        tracing::info!(
            directory = %self.directory.display(),
            records = index.len(),
            "memento index rebuilt"
        );
        Ok(index)
    }

    /// Bring a loaded index in line with the record files: entries whose file
    /// is gone are dropped, record files the index never saw are added.
    async fn reconcile_index(
        &self,
        mut index: MementoIndex,
    ) -> Result<MementoIndex, RepositoryError> {
        let files = self.record_files().await?;
        let on_disk: HashSet<&str> = files.iter().map(|(id, _)| id.as_str()).collect();

        let missing: Vec<String> = index
            .records()
            .filter(|m| !on_disk.contains(m.id.as_str()))
            .map(|m| m.id.clone())
            .collect();
        for id in &missing {
            tracing::warn!(memento_id = %id, "indexed record file missing, entry dropped");
            index.remove(id);
        }

        let mut adopted = 0usize;
        for (file_id, path) in &files {
            if index.contains(file_id) {
                continue;
            }
            if let Some(meta) = scan_record(path, file_id).await {
                tracing::warn!(memento_id = %file_id, "unindexed record file adopted");
                index.insert(meta);
                adopted += 1;
            }
        }

        if adopted > 0 || !missing.is_empty() {
            tracing::info!(
                directory = %self.directory.display(),
                adopted,
                dropped = missing.len(),
                records = index.len(),
                "memento index reconciled"
            );
        }
        Ok(index)
    }

    async fn persist_index(&self, index: &MementoIndex) -> Result<(), RepositoryError> {
        write_atomic(&self.index_path(), &index.to_bytes()?).await?;
        let stats = RepositoryStatistics::from_records(index.records(), Utc::now());
        write_atomic(&self.statistics_path(), &serde_json::to_vec_pretty(&stats)?).await
    }

    /// Cache first, then the record file.
    async fn read_memento(
        &self,
        state: &mut FileState,
        id: &str,
    ) -> Result<Option<AppStateMemento>, RepositoryError> {
        if let Some(memento) = state.cache.get(id) {
            return Ok(Some(memento.clone()));
        }

        let path = self.record_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RepositoryError::io(path, e)),
        };
        let memento = decode_record(&bytes)?;
        state.cache.put(id.to_string(), memento.clone());
        Ok(Some(memento))
    }

    async fn remove_record_file(&self, id: &str) -> Result<bool, RepositoryError> {
        let path = self.record_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RepositoryError::io(path, e)),
        }
    }

    /// Drop the oldest records beyond `max_mementos`.
    async fn prune(&self, state: &mut FileState) -> Result<usize, RepositoryError> {
        if self.max_mementos == 0 || state.index.len() <= self.max_mementos {
            return Ok(0);
        }

        let excess = state.index.len() - self.max_mementos;
        let victims: Vec<String> = sorted_records(state.index.records())
            .into_iter()
            .take(excess)
            .map(|m| m.id.clone())
            .collect();

        for id in &victims {
            self.remove_record_file(id).await?;
            state.index.remove(id);
            state.cache.pop(id);
        }

        tracing::info!(
            pruned = victims.len(),
            max_mementos = self.max_mementos,
            "old mementos pruned"
        );
        Ok(victims.len())
    }
}

/// Metadata for a record file, or `None` (logged) when it cannot be used.
async fn scan_record(path: &Path, file_id: &str) -> Option<RecordMeta> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error.message = %e,
                "unreadable record file"
            );
            return None;
        }
    };
    let memento = match decode_record(&bytes) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error.kind = e.kind(),
                error.message = %e,
                "skipping undecodable record file"
            );
            return None;
        }
    };
    if memento.id != file_id {
        tracing::warn!(
            path = %path.display(),
            memento_id = %memento.id,
            "record file name does not match memento id, skipped"
        );
        return None;
    }

    Some(RecordMeta {
        id: memento.id.clone(),
        timestamp: memento.timestamp,
        size_bytes: bytes.len() as u64,
        compressed: is_compressed_record(&bytes),
        originator_id: memento.originator_id,
    })
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RepositoryError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| RepositoryError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| RepositoryError::io(path, e))
}

#[async_trait]
impl MementoRepository for FileMementoRepository {
    fn name(&self) -> &str {
        "file"
    }

    async fn initialize(&self) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| RepositoryError::io(&self.directory, e))?;

        let index = match MementoIndex::load(&self.index_path()).await {
            Ok(Some(index)) => self.reconcile_index(index).await?,
            Ok(None) => self.rebuild_index().await?,
            Err(e) => {
                tracing::warn!(
                    error.kind = e.kind(),
                    error.message = %e,
                    "memento index unreadable, rebuilding"
                );
                self.rebuild_index().await?
            }
        };
        self.persist_index(&index).await?;

        tracing::debug!(
            repository = "file",
            directory = %self.directory.display(),
            records = index.len(),
            "repository initialized"
        );
        *guard = Some(FileState {
            index,
            cache: LruCache::new(self.cache_capacity),
        });
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        self.state.lock().await.is_some()
    }

    async fn save_memento(&self, memento: &AppStateMemento) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(RepositoryError::NotInitialized)?;
        validate_memento_id(&memento.id)?;

        let record = encode_record(memento, self.compression_threshold)?;
        let meta = RecordMeta::new(memento, &record);
        write_atomic(&self.record_path(&memento.id), &record.bytes).await?;

        tracing::debug!(
            memento_id = %meta.id,
            size = meta.size_bytes,
            compressed = meta.compressed,
            "memento saved"
        );
        state.index.insert(meta);
        state.cache.put(memento.id.clone(), memento.clone());

        self.prune(state).await?;
        self.persist_index(&state.index).await
    }

    async fn get_latest_memento(&self) -> Result<Option<AppStateMemento>, RepositoryError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(RepositoryError::NotInitialized)?;

        let newest_first: Vec<String> = sorted_records(state.index.records())
            .into_iter()
            .rev()
            .map(|m| m.id.clone())
            .collect();

        let mut dropped = false;
        let mut latest = None;
        for id in newest_first {
            match self.read_memento(state, &id).await {
                Ok(Some(memento)) => {
                    latest = Some(memento);
                    break;
                }
                Ok(None) => {
                    tracing::warn!(memento_id = %id, "indexed record file missing, entry dropped");
                    state.index.remove(&id);
                    dropped = true;
                }
                Err(e) => tracing::warn!(
                    memento_id = %id,
                    error.kind = e.kind(),
                    error.message = %e,
                    "latest memento unreadable, trying the next newest"
                ),
            }
        }

        if dropped {
            if let Err(e) = self.persist_index(&state.index).await {
                tracing::warn!(
                    error.kind = e.kind(),
                    error.message = %e,
                    "memento index write failed"
                );
            }
        }
        Ok(latest)
    }

    async fn get_memento_by_id(
        &self,
        id: &str,
    ) -> Result<Option<AppStateMemento>, RepositoryError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(RepositoryError::NotInitialized)?;
        if validate_memento_id(id).is_err() {
            return Ok(None);
        }
        self.read_memento(state, id).await
    }

    async fn get_all_mementos(&self) -> Result<Vec<AppStateMemento>, RepositoryError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(RepositoryError::NotInitialized)?;

        let ids: Vec<String> = sorted_records(state.index.records())
            .into_iter()
            .map(|m| m.id.clone())
            .collect();

        let mut mementos = Vec::with_capacity(ids.len());
        for id in ids {
            match self.read_memento(state, &id).await {
                Ok(Some(memento)) => mementos.push(memento),
                Ok(None) => tracing::warn!(memento_id = %id, "indexed record file missing"),
                Err(e) => tracing::warn!(
                    memento_id = %id,
                    error.kind = e.kind(),
                    error.message = %e,
                    "skipping unreadable memento"
                ),
            }
        }
        Ok(mementos)
    }

    async fn delete_memento(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(RepositoryError::NotInitialized)?;
        if validate_memento_id(id).is_err() {
            return Ok(false);
        }

        let indexed = state.index.remove(id).is_some();
        state.cache.pop(id);
        let removed = self.remove_record_file(id).await?;
        if indexed {
            self.persist_index(&state.index).await?;
        }
        Ok(indexed || removed)
    }

    async fn clear_all_mementos(&self) -> Result<usize, RepositoryError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(RepositoryError::NotInitialized)?;

        let ids: Vec<String> = state.index.records().map(|m| m.id.clone()).collect();
        for id in &ids {
            self.remove_record_file(id).await?;
        }
        state.index.clear();
        state.cache.clear();
        self.persist_index(&state.index).await?;

        tracing::info!(removed = ids.len(), "all mementos cleared");
        Ok(ids.len())
    }

    async fn get_statistics(&self) -> Result<RepositoryStatistics, RepositoryError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(RepositoryError::NotInitialized)?;
        Ok(RepositoryStatistics::from_records(
            state.index.records(),
            Utc::now(),
        ))
    }

    async fn dispose(&self) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().await;
        if guard.take().is_some() {
            tracing::debug!(repository = "file", "repository disposed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use statekeep_core::event::LifecyclePhase;
    use tempfile::TempDir;

    fn memento(id: &str, secs: i64, uid: &str) -> AppStateMemento {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut m = AppStateMemento::new(LifecyclePhase::Paused)
            .with_id(id)
            .with_timestamp(base + Duration::seconds(secs));
        m.user_session.insert("uid".into(), json!(uid));
        m
    }

    async fn open(dir: &TempDir) -> FileMementoRepository {
        let repo = FileMementoRepository::new(dir.path());
        repo.initialize().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_operations_require_initialize() {
        let dir = TempDir::new().unwrap();
        let repo = FileMementoRepository::new(dir.path());
        assert!(matches!(
            repo.get_latest_memento().await,
            Err(RepositoryError::NotInitialized)
        ));
        assert!(matches!(
            repo.save_memento(&memento("a", 0, "u")).await,
            Err(RepositoryError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        {
            let repo = open(&dir).await;
            repo.save_memento(&memento("s2", 10, "u2")).await.unwrap();
            repo.save_memento(&memento("s1", 0, "u1")).await.unwrap();
            repo.dispose().await.unwrap();
        }

        let repo = open(&dir).await;
        let latest = repo.get_latest_memento().await.unwrap().unwrap();
        assert_eq!(latest.id, "s2");

        let ids: Vec<String> = repo
            .get_all_mementos()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["s1".to_string(), "s2".to_string()]);
        assert!(dir.path().join("memento_s1.json").exists());
        assert!(dir.path().join("statistics.json").exists());
    }

    #[tokio::test]
    async fn test_large_payload_is_compressed_on_disk() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir).await;

        let text = "x".repeat(2000);
        let mut m = memento("big", 0, "u");
        m.ui_state.insert("notes".into(), json!(text));
        repo.save_memento(&m).await.unwrap();

        let bytes = std::fs::read(dir.path().join("memento_big.json")).unwrap();
        assert!(is_compressed_record(&bytes));

        // bypass the cache
        repo.dispose().await.unwrap();
        let repo = open(&dir).await;
        let loaded = repo.get_memento_by_id("big").await.unwrap().unwrap();
        assert_eq!(loaded.ui_state.get("notes"), Some(&json!(text)));
        assert_eq!(repo.get_statistics().await.unwrap().compressed_count, 1);
    }

    #[tokio::test]
    async fn test_missing_or_corrupt_index_is_rebuilt() {
        let dir = TempDir::new().unwrap();
        {
            let repo = open(&dir).await;
            repo.save_memento(&memento("a", 0, "u1")).await.unwrap();
            repo.save_memento(&memento("b", 5, "u2")).await.unwrap();
        }

        std::fs::remove_file(dir.path().join("index.json")).unwrap();
        let repo = open(&dir).await;
        assert_eq!(repo.get_statistics().await.unwrap().total_mementos, 2);
        repo.dispose().await.unwrap();

        std::fs::write(dir.path().join("index.json"), b"][").unwrap();
        let repo = open(&dir).await;
        let latest = repo.get_latest_memento().await.unwrap().unwrap();
        assert_eq!(latest.id, "b");
    }

    #[tokio::test]
    async fn test_unindexed_record_is_adopted_on_initialize() {
        let dir = TempDir::new().unwrap();
        {
            let repo = open(&dir).await;
            repo.save_memento(&memento("old", 0, "u1")).await.unwrap();
            repo.dispose().await.unwrap();
        }

        // record written, index never updated
        let record = encode_record(&memento("new", 60, "u2"), DEFAULT_COMPRESSION_THRESHOLD)
            .unwrap();
        std::fs::write(dir.path().join("memento_new.json"), &record.bytes).unwrap();

        let repo = open(&dir).await;
        let latest = repo.get_latest_memento().await.unwrap().unwrap();
        assert_eq!(latest.id, "new");
        let ids: Vec<String> = repo
            .get_all_mementos()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["old".to_string(), "new".to_string()]);

        let index = MementoIndex::load(&dir.path().join("index.json"))
            .await
            .unwrap()
            .unwrap();
        assert!(index.contains("new"));
    }

    #[tokio::test]
    async fn test_missing_record_is_dropped_on_initialize() {
        let dir = TempDir::new().unwrap();
        {
            let repo = open(&dir).await;
            repo.save_memento(&memento("a", 0, "u1")).await.unwrap();
            repo.save_memento(&memento("b", 10, "u2")).await.unwrap();
            repo.dispose().await.unwrap();
        }

        std::fs::remove_file(dir.path().join("memento_b.json")).unwrap();
        let repo = open(&dir).await;
        let latest = repo.get_latest_memento().await.unwrap().unwrap();
        assert_eq!(latest.id, "a");
        assert_eq!(repo.get_statistics().await.unwrap().total_mementos, 1);
    }

    #[tokio::test]
    async fn test_latest_falls_back_when_newest_file_vanishes() {
        let dir = TempDir::new().unwrap();
        let repo = FileMementoRepository::new(dir.path()).with_cache_capacity(1);
        repo.initialize().await.unwrap();
        repo.save_memento(&memento("b", 10, "u2")).await.unwrap();
        // evicts "b" from the cache
        repo.save_memento(&memento("a", 0, "u1")).await.unwrap();

        std::fs::remove_file(dir.path().join("memento_b.json")).unwrap();
        let latest = repo.get_latest_memento().await.unwrap().unwrap();
        assert_eq!(latest.id, "a");
        assert_eq!(repo.get_statistics().await.unwrap().total_mementos, 1);

        let index = MementoIndex::load(&dir.path().join("index.json"))
            .await
            .unwrap()
            .unwrap();
        assert!(!index.contains("b"));
    }

    #[tokio::test]
    async fn test_unreadable_record_is_skipped() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir).await;
        repo.save_memento(&memento("good", 0, "u")).await.unwrap();
        repo.save_memento(&memento("bad", 1, "u")).await.unwrap();
        repo.dispose().await.unwrap();

        std::fs::write(dir.path().join("memento_bad.json"), b"garbage").unwrap();
        let repo = open(&dir).await;
        let all = repo.get_all_mementos().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "good");
    }

    #[tokio::test]
    async fn test_retention_prunes_oldest() {
        let dir = TempDir::new().unwrap();
        let repo = FileMementoRepository::new(dir.path()).with_max_mementos(2);
        repo.initialize().await.unwrap();

        for (i, id) in ["m0", "m1", "m2", "m3"].iter().enumerate() {
            repo.save_memento(&memento(id, i as i64, "u")).await.unwrap();
        }

        let ids: Vec<String> = repo
            .get_all_mementos()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m2".to_string(), "m3".to_string()]);
        assert!(!dir.path().join("memento_m0.json").exists());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir).await;
        repo.save_memento(&memento("a", 0, "u")).await.unwrap();
        repo.save_memento(&memento("b", 1, "u")).await.unwrap();
        repo.save_memento(&memento("c", 2, "u")).await.unwrap();

        assert!(repo.delete_memento("a").await.unwrap());
        assert!(!repo.delete_memento("a").await.unwrap());
        assert!(repo.get_memento_by_id("a").await.unwrap().is_none());
        assert!(!repo.delete_memento("../escape").await.unwrap());

        assert_eq!(repo.clear_all_mementos().await.unwrap(), 2);
        assert_eq!(
            repo.get_statistics().await.unwrap(),
            RepositoryStatistics::default()
        );
        assert!(repo.get_latest_memento().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_id_is_rejected_on_save() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir).await;
        let bad = memento("a/b", 0, "u");
        assert!(matches!(
            repo.save_memento(&bad).await,
            Err(RepositoryError::InvalidId(_))
        ));
    }
}

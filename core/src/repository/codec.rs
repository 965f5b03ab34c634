//! Record encoding shared by all repository backends.
//!
//! A record is the memento's JSON map tagged with `_compressed: false`. When
//! the serialized map exceeds the threshold it is zstd-compressed, base64
//! encoded and wrapped in an envelope tagged `_compressed: true`.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::RepositoryError;
use crate::memento::{AppStateMemento, JsonMap};

pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;
pub const COMPRESSED_MARKER: &str = "_compressed";

const ENCODING: &str = "zstd+base64";
const ZSTD_LEVEL: i32 = 3;
const MAX_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct EncodedRecord {
    pub bytes: Vec<u8>,
    pub compressed: bool,
    /// Size of the uncompressed serialized map.
    pub raw_size: usize,
}

/// Index entry describing one stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub size_bytes: u64,
    pub compressed: bool,
    pub originator_id: String,
}

impl RecordMeta {
    pub fn new(memento: &AppStateMemento, record: &EncodedRecord) -> Self {
        Self {
            id: memento.id.clone(),
            timestamp: memento.timestamp,
            size_bytes: record.bytes.len() as u64,
            compressed: record.compressed,
            originator_id: memento.originator_id.clone(),
        }
    }
}

/// Ids become file names, so only `[A-Za-z0-9_-]` is accepted.
pub fn validate_memento_id(id: &str) -> Result<(), RepositoryError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RepositoryError::InvalidId(id.to_string()))
    }
}

pub fn encode_record(
    memento: &AppStateMemento,
    threshold: usize,
) -> Result<EncodedRecord, RepositoryError> {
    let mut map = memento.to_map()?;
    let raw = serde_json::to_vec(&map)?;

    if raw.len() > threshold {
        let packed = zstd::encode_all(raw.as_slice(), ZSTD_LEVEL)
            .map_err(|e| RepositoryError::Codec(format!("zstd compress: {e}")))?;
        let envelope = json!({
            COMPRESSED_MARKER: true,
            "encoding": ENCODING,
            "originalSize": raw.len(),
            "data": base64::engine::general_purpose::STANDARD.encode(packed),
        });
        return Ok(EncodedRecord {
            bytes: serde_json::to_vec(&envelope)?,
            compressed: true,
            raw_size: raw.len(),
        });
    }

    map.insert(COMPRESSED_MARKER.to_string(), Value::Bool(false));
    Ok(EncodedRecord {
        bytes: serde_json::to_vec(&map)?,
        compressed: false,
        raw_size: raw.len(),
    })
}

pub fn decode_record(bytes: &[u8]) -> Result<AppStateMemento, RepositoryError> {
    let mut map: JsonMap = serde_json::from_slice(bytes)?;

    match map.remove(COMPRESSED_MARKER) {
        Some(Value::Bool(true)) => {
            let encoding = map.get("encoding").and_then(Value::as_str);
            if encoding != Some(ENCODING) {
                return Err(RepositoryError::Codec(format!(
                    "unsupported record encoding: {encoding:?}"
                )));
            }
            let data = map
                .get("data")
                .and_then(Value::as_str)
                .ok_or_else(|| RepositoryError::Codec("compressed record has no data".into()))?;
            let packed = base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| RepositoryError::Codec(format!("base64 decode: {e}")))?;
            let raw = zstd::decode_all(packed.as_slice())
                .map_err(|e| RepositoryError::Codec(format!("zstd decompress: {e}")))?;
            Ok(serde_json::from_slice(&raw)?)
        }
        Some(Value::Bool(false)) | None => Ok(AppStateMemento::from_map(map)?),
        Some(other) => Err(RepositoryError::Codec(format!(
            "invalid {COMPRESSED_MARKER} marker: {other}"
        ))),
    }
}

/// Whether stored bytes carry the compressed marker.
pub fn is_compressed_record(bytes: &[u8]) -> bool {
    serde_json::from_slice::<JsonMap>(bytes)
        .ok()
        .and_then(|m| m.get(COMPRESSED_MARKER).and_then(Value::as_bool))
        .unwrap_or(false)
}

//! # Memento repositories
//!
//! The repository is the caretaker: it stores and retrieves composite
//! mementos without interpreting them. Backends implement
//! [`MementoRepository`]; the in-memory backend lives here, the file-backed
//! one in the plugins crate. Both share the record codec and statistics.

pub mod codec;
pub mod memory;
pub mod stats;
pub mod traits;

pub use codec::{
    decode_record, encode_record, is_compressed_record, validate_memento_id, EncodedRecord,
    RecordMeta, COMPRESSED_MARKER, DEFAULT_COMPRESSION_THRESHOLD,
};
pub use memory::InMemoryRepository;
pub use stats::RepositoryStatistics;
pub use traits::MementoRepository;

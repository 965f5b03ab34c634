//! Persistent memento repositories.

pub mod file;
pub mod index;

pub use file::FileMementoRepository;
pub use index::MementoIndex;

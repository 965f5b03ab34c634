#[allow(clippy::module_inception)]
pub mod error;
pub mod repository;

pub use error::{CliError, LifecycleError};
pub use repository::RepositoryError;

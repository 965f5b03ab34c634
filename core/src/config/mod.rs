mod load;
mod types;

pub use load::{get_statekeep_data_dir, load_default, load_file, load_from_path};
pub use types::{
    AppConfig, EventsOutConfig, FileRepositoryConfig, LifecycleConfig, LoggingConfig,
    RepositoryConfig, RepositoryProvider,
};

//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `statekeep_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_file, load_from_path, AppConfig, EventsOutConfig, FileRepositoryConfig,
    LifecycleConfig, LoggingConfig, RepositoryConfig, RepositoryProvider,
};
pub use crate::context::{AppContext, RepositoryFactory};
pub use crate::error::{CliError, LifecycleError, RepositoryError};
pub use crate::event::{
    EventPriority, EventSource, LifecycleEvent, LifecycleEventType, LifecyclePhase,
};
pub use crate::events_out::EventsOutTx;
pub use crate::lifecycle::{CycleReport, LifecycleManager, ManagerStatus, RestoreOutcome};
pub use crate::memento::{
    AppStateMemento, ComponentMemento, ConfigSlice, JsonMap, NavigationSlice, PatternSlice,
    SessionSlice, StateKey, StateMemento, StateSlice, UiSlice,
};
pub use crate::observer::{
    ClosureStateObserver, DispatchReport, LifecycleObserver, ObserverRegistry, SliceObserver,
    StateAwareObserver,
};
pub use crate::repository::{
    InMemoryRepository, MementoRepository, RecordMeta, RepositoryStatistics,
};

//! Observer contract, the registry that dispatches lifecycle events to
//! observers, and closure/slice adapters for plugging components in without
//! implementing the traits by hand.

pub mod adapters;
pub mod registry;
pub mod traits;

pub use adapters::{ClosureStateObserver, ClosureStateObserverBuilder, SliceObserver};
pub use registry::{DispatchReport, ObserverHandle, ObserverRegistry};
pub use traits::{LifecycleObserver, StateAwareObserver};

//! Application lifecycle state preservation.
//!
//! Platform phase reports become [`LifecycleEvent`](event::LifecycleEvent)s,
//! observers are notified through the [`ObserverRegistry`](observer::ObserverRegistry),
//! and the [`LifecycleManager`](lifecycle::LifecycleManager) captures and
//! restores component state as composite mementos kept in a
//! [`MementoRepository`](repository::MementoRepository).

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod events_out;
pub mod lifecycle;
pub mod memento;
pub mod observer;
pub mod repository;

//! Log listeners for k8s-event
//!
//! This crate provides the listener capability log call sites talk to, the
//! registry listeners are attached to, and the listener that turns log calls
//! into Kubernetes events.

mod event_listener;
mod listener;
mod logger;
mod registry;

pub use event_listener::EventListener;
pub use listener::Listener;
pub use logger::PluginLogger;
pub use registry::{ListenerHandle, ListenerRegistry, RegistryError};

// Re-export types used in our public API
pub use k8s_event_types::{LevelMask, Severity};

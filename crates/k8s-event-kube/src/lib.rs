//! Kubernetes integration for k8s-event
//!
//! This crate resolves the object events are attributed to, and provides the
//! broadcaster that rate limits events and delivers them to the API server.

mod broadcaster;
mod client;
mod recorder;
mod reference;
mod sink;

pub use broadcaster::{Broadcaster, CorrelatorOptions, MAX_QUEUED_EVENTS};
pub use client::connect;
pub use recorder::{BroadcastRecorder, EventRecorder, PendingEvent};
pub use reference::{NAMESPACE_ENV, POD_NAME_ENV, resolve, resolve_from_env, resolve_with};
pub use sink::{EventSink, KubeSink};

// Re-export types that are used in our public API
pub use k8s_event_types::EventType;
pub use k8s_openapi::api::core::v1::ObjectReference;

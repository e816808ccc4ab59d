//! k8s-event replicates DNS plugin log calls as Kubernetes Events
//!
//! The `k8s_event` stanza of a Corefile selects which severities are
//! forwarded and how aggressively they are rate limited. At startup the
//! plugin attaches an [`EventListener`] to the host's log registry; from then
//! on, every matching log call becomes an Event on the DNS server's Pod.

pub mod config;
mod error;
mod plugin;
mod setup;

pub use error::{ConfigError, PluginError};
pub use plugin::K8sEvent;
pub use setup::{parse, setup};

// Re-export types used in our public API
pub use k8s_event_log::{EventListener, ListenerRegistry, PluginLogger};
pub use k8s_event_types::{LevelMask, PLUGIN_NAME, RateSettings, Settings, Severity};

//! Startup and shutdown of the event bridge

use std::sync::Arc;

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::ObjectReference;
use tracing::info;

use k8s_event_kube::{Broadcaster, CorrelatorOptions, EventSink, KubeSink};
use k8s_event_log::{EventListener, ListenerHandle, ListenerRegistry};
use k8s_event_types::{COMPONENT_NAME, Settings};

/// The `k8s_event` plugin instance
pub struct K8sEvent {
    settings: Settings,
    reference: ObjectReference,
    broadcaster: Option<Broadcaster>,
    handle: Option<ListenerHandle>,
}

impl K8sEvent {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            reference: ObjectReference::default(),
            broadcaster: None,
            handle: None,
        }
    }

    /// Resolve the event reference from the process environment
    pub fn init(&mut self) {
        self.reference = k8s_event_kube::resolve_from_env();
    }

    /// Resolve the event reference using `lookup` to read environment values
    pub fn init_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.reference = k8s_event_kube::resolve_with(lookup);
    }

    /// Start publishing events through `client` and attach the listener
    pub fn startup(&mut self, client: kube::Client, registry: &ListenerRegistry) -> Result<()> {
        // Only a pod reference identifies this replica
        let instance = match self.reference.kind.as_deref() {
            Some("Pod") => self.reference.name.clone(),
            _ => None,
        };
        self.startup_with_sink(KubeSink::new(client, instance), registry)
    }

    /// Start publishing events to `sink` and attach the listener
    pub fn startup_with_sink<S: EventSink>(
        &mut self,
        sink: S,
        registry: &ListenerRegistry,
    ) -> Result<()> {
        if self.broadcaster.is_some() {
            anyhow::bail!("k8s_event has already been started");
        }

        let broadcaster = if self.settings.rate_configured {
            Broadcaster::with_correlator_options(CorrelatorOptions::from(self.settings.rate))
        } else {
            Broadcaster::new()
        };
        let recorder = broadcaster.new_recorder(COMPONENT_NAME);
        broadcaster
            .start_recording_to_sink(sink)
            .context("Failed to start event broadcaster")?;

        let listener = EventListener::new(
            self.reference.clone(),
            Arc::new(recorder),
            self.settings.levels,
        );
        let handle = registry.register(Arc::new(listener)).inspect_err(|_| {
            broadcaster.shutdown();
        })?;

        info!(
            listener = handle.name(),
            levels = ?self.settings.levels,
            kind = self.reference.kind.as_deref().unwrap_or_default(),
            name = self.reference.name.as_deref().unwrap_or_default(),
            "Replicating log calls to Kubernetes events"
        );

        self.broadcaster = Some(broadcaster);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the broadcaster and detach the listener
    ///
    /// Callers must make sure no log calls race with shutdown; anything
    /// logged afterwards is dropped.
    pub fn shutdown(&mut self, registry: &ListenerRegistry) -> Result<()> {
        let Some(broadcaster) = &self.broadcaster else {
            anyhow::bail!("k8s_event has not been started");
        };
        broadcaster.shutdown();

        if let Some(handle) = self.handle.take() {
            registry.deregister(handle)?;
        }
        Ok(())
    }

    /// Wait until events queued before shutdown have been delivered, or the
    /// broadcaster's shutdown grace period has passed
    pub async fn stopped(&self) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.join().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_event_kube::PendingEvent;
    use k8s_event_log::PluginLogger;
    use k8s_event_types::EventType;
    use parking_lot::Mutex;

    use crate::config::Dispenser;
    use crate::setup::parse;

    #[derive(Clone, Default)]
    struct CollectingSink {
        events: Arc<Mutex<Vec<PendingEvent>>>,
    }

    impl EventSink for CollectingSink {
        async fn publish(&self, event: &PendingEvent) -> Result<()> {
            self.events.lock().push(event.clone());
            Ok(())
        }
    }

    fn settings(input: &str) -> Settings {
        let mut d = Dispenser::parse(input).unwrap();
        parse(&mut d).unwrap().unwrap()
    }

    fn pod_env(key: &str) -> Option<String> {
        match key {
            "COREDNS_NAMESPACE" => Some("kube-system".to_string()),
            "COREDNS_POD_NAME" => Some("coredns-0".to_string()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_lifecycle_forwards_log_calls() {
        let registry = Arc::new(ListenerRegistry::new());
        let sink = CollectingSink::default();

        let mut plugin = K8sEvent::new(settings("k8s_event {\n    level info error\n}"));
        plugin.init_with(pod_env);
        plugin.startup_with_sink(sink.clone(), &registry).unwrap();
        assert_eq!(registry.len(), 1);

        let log = PluginLogger::new("forward", Arc::clone(&registry));
        log.info("started");
        log.warning("not forwarded");
        log.errorf(format_args!("timeout after {}s", 5));

        plugin.shutdown(&registry).unwrap();
        plugin.stopped().await;
        assert!(registry.is_empty());

        // Nothing reaches the sink once the listener is gone
        log.error("after shutdown");

        let events = sink.events.lock();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].source, "CoreDNS");
        assert_eq!(events[0].event_type, EventType::Normal);
        assert_eq!(events[0].reason, "CoreDNSInfo");
        assert_eq!(events[0].message, "plugin/forward: started");
        assert_eq!(events[0].reference.kind.as_deref(), Some("Pod"));
        assert_eq!(events[0].reference.name.as_deref(), Some("coredns-0"));
        assert_eq!(events[0].reference.namespace.as_deref(), Some("kube-system"));

        assert_eq!(events[1].event_type, EventType::Warning);
        assert_eq!(events[1].reason, "CoreDNSError");
        assert_eq!(events[1].message, "plugin/forward: timeout after 5s");
    }

    #[tokio::test]
    async fn test_configured_rate_limits_events() {
        let registry = Arc::new(ListenerRegistry::new());
        let sink = CollectingSink::default();

        let mut plugin = K8sEvent::new(settings("k8s_event {\n    rate 0.001 3\n}"));
        plugin.init_with(|_| None);
        plugin.startup_with_sink(sink.clone(), &registry).unwrap();

        let log = PluginLogger::new("errors", Arc::clone(&registry));
        for i in 0..10 {
            log.warningf(format_args!("spike {i}"));
        }

        plugin.shutdown(&registry).unwrap();
        plugin.stopped().await;

        let events = sink.events.lock();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].reference.kind.as_deref(), Some("Namespace"));
        assert_eq!(events[0].reference.name.as_deref(), Some("default"));
    }

    #[tokio::test]
    async fn test_start_twice_and_stop_without_start() {
        let registry = ListenerRegistry::new();

        let mut idle = K8sEvent::new(Settings::default());
        assert!(idle.shutdown(&registry).is_err());

        let mut plugin = K8sEvent::new(Settings::default());
        plugin.init_with(pod_env);
        plugin.startup_with_sink(CollectingSink::default(), &registry).unwrap();
        assert!(plugin.startup_with_sink(CollectingSink::default(), &registry).is_err());
        assert_eq!(registry.len(), 1);

        plugin.shutdown(&registry).unwrap();
        plugin.stopped().await;
    }
}

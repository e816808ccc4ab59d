use std::fmt;
use std::sync::Arc;

use k8s_openapi::api::core::v1::ObjectReference;

use k8s_event_kube::EventRecorder;
use k8s_event_types::{LevelMask, PLUGIN_NAME, Severity};

use crate::listener::Listener;

/// Listener that republishes log calls as Kubernetes events
///
/// The reference and level mask are fixed at construction, so a single
/// instance can be shared across threads without locking.
pub struct EventListener {
    recorder: Arc<dyn EventRecorder>,
    reference: ObjectReference,
    levels: LevelMask,
    id: u32,
}

impl EventListener {
    pub fn new(
        reference: ObjectReference,
        recorder: Arc<dyn EventRecorder>,
        levels: LevelMask,
    ) -> Self {
        Self {
            recorder,
            reference,
            levels,
            id: rand::random(),
        }
    }
}

impl Listener for EventListener {
    fn name(&self) -> String {
        format!("{}-{}", PLUGIN_NAME, self.id)
    }

    fn log(&self, severity: Severity, plugin: &str, args: fmt::Arguments<'_>) {
        if !self.levels.allows(severity) {
            return;
        }
        // The tag is joined to the message without a separator
        let message = format!("{plugin}{args}");
        self.recorder.event(
            &self.reference,
            severity.event_type(),
            severity.reason(),
            message,
        );
    }
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("name", &self.name())
            .field("reference", &self.reference)
            .field("levels", &self.levels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_event_kube::EventType;
    use parking_lot::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    struct RecordedEvent {
        reference: ObjectReference,
        event_type: EventType,
        reason: String,
        message: String,
    }

    #[derive(Default)]
    struct MockRecorder {
        events: Mutex<Vec<RecordedEvent>>,
    }

    impl MockRecorder {
        fn count(&self) -> usize {
            self.events.lock().len()
        }

        fn contains(
            &self,
            reference: &ObjectReference,
            event_type: EventType,
            reason: &str,
            message: &str,
        ) -> bool {
            self.events.lock().iter().any(|e| {
                e.reference == *reference
                    && e.event_type == event_type
                    && e.reason == reason
                    && e.message == message
            })
        }
    }

    impl EventRecorder for MockRecorder {
        fn event(
            &self,
            reference: &ObjectReference,
            event_type: EventType,
            reason: &str,
            message: String,
        ) {
            self.events.lock().push(RecordedEvent {
                reference: reference.clone(),
                event_type,
                reason: reason.to_string(),
                message,
            });
        }
    }

    fn pod1() -> ObjectReference {
        ObjectReference {
            kind: Some("Pod".to_string()),
            name: Some("pod1".to_string()),
            namespace: Some("ns1".to_string()),
            ..Default::default()
        }
    }

    fn call_every_method(listener: &EventListener, plugin: &str, args: &str) {
        listener.debug(plugin, args);
        listener.debugf(plugin, format_args!("fmt {}", args));
        listener.info(plugin, args);
        listener.infof(plugin, format_args!("fmt {}", args));
        listener.warning(plugin, args);
        listener.warningf(plugin, format_args!("fmt {}", args));
        listener.error(plugin, args);
        listener.errorf(plugin, format_args!("fmt {}", args));
        listener.fatal(plugin, args);
        listener.fatalf(plugin, format_args!("fmt {}", args));
    }

    #[test]
    fn test_event_count() {
        let cases = [
            (LevelMask::all(), 10),
            (
                [Severity::Debug, Severity::Error].into_iter().collect::<LevelMask>(),
                4,
            ),
            (LevelMask::empty().with(Severity::Debug), 2),
            (LevelMask::empty(), 0),
            (LevelMask::default(), 4),
        ];

        for (i, (levels, expected)) in cases.into_iter().enumerate() {
            let recorder = Arc::new(MockRecorder::default());
            let listener = EventListener::new(pod1(), recorder.clone(), levels);
            call_every_method(&listener, "plugin1", "args");
            assert_eq!(recorder.count(), expected, "case {i}");
        }
    }

    #[test]
    fn test_event_exists() {
        let namespace_ref = ObjectReference {
            kind: Some("Namespace".to_string()),
            namespace: Some("ns1".to_string()),
            ..Default::default()
        };

        for reference in [pod1(), namespace_ref] {
            let recorder = Arc::new(MockRecorder::default());
            let listener =
                EventListener::new(reference.clone(), recorder.clone(), LevelMask::all());
            call_every_method(&listener, "plugin1", "args");

            let expected = [
                (EventType::Normal, "CoreDNSDebug"),
                (EventType::Normal, "CoreDNSInfo"),
                (EventType::Warning, "CoreDNSWarning"),
                (EventType::Warning, "CoreDNSError"),
                (EventType::Warning, "CoreDNSFatal"),
            ];
            for (event_type, reason) in expected {
                assert!(
                    recorder.contains(&reference, event_type, reason, "plugin1args"),
                    "missing plain {reason}"
                );
                assert!(
                    recorder.contains(&reference, event_type, reason, "plugin1fmt args"),
                    "missing formatted {reason}"
                );
            }
        }
    }

    #[test]
    fn test_debug_message_has_no_separator() {
        let recorder = Arc::new(MockRecorder::default());
        let listener = EventListener::new(pod1(), recorder.clone(), LevelMask::all());
        listener.debug("plugin1", "args");

        let events = recorder.events.lock();
        assert_eq!(
            events[0],
            RecordedEvent {
                reference: pod1(),
                event_type: EventType::Normal,
                reason: "CoreDNSDebug".to_string(),
                message: "plugin1args".to_string(),
            }
        );
    }

    #[test]
    fn test_name_is_plugin_and_id() {
        let recorder = Arc::new(MockRecorder::default());
        let listener = EventListener::new(pod1(), recorder, LevelMask::default());
        let name = listener.name();
        let suffix = name.strip_prefix("k8s_event-").unwrap();
        assert!(suffix.parse::<u32>().is_ok());
        // Stable for the lifetime of the instance
        assert_eq!(name, listener.name());
    }
}

use std::collections::HashMap;
use std::future::Future;

use anyhow::{Context, Result};
use kube::runtime::events::{Event, EventType as KubeEventType, Recorder, Reporter};
use parking_lot::Mutex;

use k8s_event_types::EventType;

use crate::recorder::PendingEvent;

/// Maximum size of an event note accepted by the API server
const MAX_NOTE_BYTES: usize = 1024;

/// Destination of events that passed the broadcaster's filters
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: &PendingEvent) -> impl Future<Output = Result<()>> + Send;
}

/// Sink writing `events.k8s.io` Events through the kube runtime recorder
///
/// The runtime recorder keeps its own cache of recent events and turns
/// repeats into event series, so one recorder is kept per source component.
pub struct KubeSink {
    client: kube::Client,
    instance: Option<String>,
    recorders: Mutex<HashMap<String, Recorder>>,
}

impl KubeSink {
    /// Create a sink reporting as `instance` (usually the pod name)
    pub fn new(client: kube::Client, instance: Option<String>) -> Self {
        Self {
            client,
            instance,
            recorders: Mutex::new(HashMap::new()),
        }
    }

    fn recorder_for(&self, source: &str) -> Recorder {
        self.recorders
            .lock()
            .entry(source.to_string())
            .or_insert_with(|| {
                let reporter = Reporter {
                    controller: source.to_string(),
                    instance: self.instance.clone(),
                };
                Recorder::new(self.client.clone(), reporter)
            })
            .clone()
    }
}

impl EventSink for KubeSink {
    async fn publish(&self, event: &PendingEvent) -> Result<()> {
        let recorder = self.recorder_for(&event.source);
        let type_ = match event.event_type {
            EventType::Normal => KubeEventType::Normal,
            EventType::Warning => KubeEventType::Warning,
        };
        let ev = Event {
            type_,
            reason: event.reason.clone(),
            note: Some(truncate_note(&event.message).to_string()),
            action: "Log".to_string(),
            secondary: None,
        };

        recorder
            .publish(&ev, &event.reference)
            .await
            .context(format!("Failed to publish {} event", event.reason))
    }
}

/// Cut a note down to the API limit without splitting a UTF-8 character
fn truncate_note(note: &str) -> &str {
    if note.len() <= MAX_NOTE_BYTES {
        return note;
    }
    let mut idx = MAX_NOTE_BYTES;
    while idx > 0 && !note.is_char_boundary(idx) {
        idx -= 1;
    }
    &note[..idx]
}

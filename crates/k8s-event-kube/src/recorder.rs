use k8s_openapi::api::core::v1::ObjectReference;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use k8s_event_types::EventType;

/// Records events against an object reference
///
/// Recording is fire-and-forget: implementations must not block and have no
/// way to report delivery failures back to the caller.
pub trait EventRecorder: Send + Sync {
    fn event(
        &self,
        reference: &ObjectReference,
        event_type: EventType,
        reason: &str,
        message: String,
    );
}

/// An event waiting to be delivered by the broadcaster
#[derive(Clone, Debug, PartialEq)]
pub struct PendingEvent {
    /// Component that recorded the event
    pub source: String,

    /// Object the event is attributed to
    pub reference: ObjectReference,

    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

impl PendingEvent {
    /// Key used by the spam filter: one bucket per source and object
    pub fn spam_key(&self) -> String {
        let r = &self.reference;
        [
            self.source.as_str(),
            r.kind.as_deref().unwrap_or_default(),
            r.namespace.as_deref().unwrap_or_default(),
            r.name.as_deref().unwrap_or_default(),
            r.uid.as_deref().unwrap_or_default(),
            r.api_version.as_deref().unwrap_or_default(),
        ]
        .join("")
    }
}

/// Recorder handed out by a [`Broadcaster`](crate::Broadcaster)
///
/// Cloning is cheap; every clone feeds the same delivery task. Events are
/// dropped when the delivery queue is full.
#[derive(Clone, Debug)]
pub struct BroadcastRecorder {
    source: String,
    tx: mpsc::Sender<PendingEvent>,
}

impl BroadcastRecorder {
    pub(crate) fn new(source: String, tx: mpsc::Sender<PendingEvent>) -> Self {
        Self { source, tx }
    }
}

impl EventRecorder for BroadcastRecorder {
    fn event(
        &self,
        reference: &ObjectReference,
        event_type: EventType,
        reason: &str,
        message: String,
    ) {
        let event = PendingEvent {
            source: self.source.clone(),
            reference: reference.clone(),
            event_type,
            reason: reason.to_string(),
            message,
        };
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(reason, "Event queue is full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(reason, "Broadcaster is shut down, dropping event");
            }
        }
    }
}

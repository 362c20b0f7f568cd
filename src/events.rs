//! Typed, synchronous, per-event-name listener registry (§9 "Event emitter
//! pattern"). One `Manager` owns one `EventEmitter`; callers register
//! listeners for the event kinds they care about and the manager emits
//! as state changes happen.

use std::collections::HashMap;
use std::sync::Mutex;

use meross_protocol::device::OnlineStatus;
use meross_protocol::error::MerossError;
use meross_protocol::{Change, ChangeSource};
use serde_json::Value;

/// One occurrence of something a `Manager` wants observers to know about.
#[derive(Debug, Clone)]
pub enum Event {
    DeviceInitialized { uuid: String },
    Connected,
    Disconnected { reason: Option<String> },
    Reconnect { attempt: u32 },
    Error { error: MerossError, uuid: Option<String> },
    PushNotification { uuid: String, namespace: String, payload: Value },
    State { uuid: String, changes: Vec<Change>, source: ChangeSource },
    Online { uuid: String, previous: OnlineStatus, current: OnlineStatus },
    RawData { uuid: String, namespace: String, payload: Value },
    RawSendData { uuid: String, namespace: String, payload: Value },
}

/// The event name a listener subscribes to; every `Event` variant maps to
/// exactly one `EventKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DeviceInitialized,
    Connected,
    Disconnected,
    Reconnect,
    Error,
    PushNotification,
    State,
    Online,
    RawData,
    RawSendData,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DeviceInitialized { .. } => EventKind::DeviceInitialized,
            Event::Connected => EventKind::Connected,
            Event::Disconnected { .. } => EventKind::Disconnected,
            Event::Reconnect { .. } => EventKind::Reconnect,
            Event::Error { .. } => EventKind::Error,
            Event::PushNotification { .. } => EventKind::PushNotification,
            Event::State { .. } => EventKind::State,
            Event::Online { .. } => EventKind::Online,
            Event::RawData { .. } => EventKind::RawData,
            Event::RawSendData { .. } => EventKind::RawSendData,
        }
    }
}

type Listener = Box<dyn Fn(&Event) + Send + Sync>;

/// Per-event-name listener registry. Listeners run synchronously and
/// in registration order on whatever task calls `emit` — callers doing
/// slow work in a listener should spawn their own task.
#[derive(Default)]
pub struct EventEmitter {
    listeners: Mutex<HashMap<EventKind, Vec<Listener>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `kind`. Returns nothing: this mirrors the
    /// teacher's fire-and-forget registration style rather than handing
    /// back a subscription handle, since nothing in this workspace needs
    /// to unregister a listener.
    pub fn on(&self, kind: EventKind, listener: impl Fn(&Event) + Send + Sync + 'static) {
        self.listeners.lock().unwrap().entry(kind).or_default().push(Box::new(listener));
    }

    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        let table = self.listeners.lock().unwrap();
        if let Some(listeners) = table.get(&kind) {
            for listener in listeners {
                listener(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn listener_only_fires_for_its_own_kind() {
        let emitter = EventEmitter::new();
        let state_hits = Arc::new(AtomicUsize::new(0));
        let online_hits = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&state_hits);
        emitter.on(EventKind::State, move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let o = Arc::clone(&online_hits);
        emitter.on(EventKind::Online, move |_| {
            o.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(Event::State { uuid: "uuid-1".into(), changes: Vec::new(), source: ChangeSource::Push });
        assert_eq!(state_hits.load(Ordering::SeqCst), 1);
        assert_eq!(online_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn multiple_listeners_for_the_same_kind_all_fire() {
        let emitter = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let h = Arc::clone(&hits);
            emitter.on(EventKind::Connected, move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            });
        }

        emitter.emit(Event::Connected);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn emitting_with_no_listeners_is_a_noop() {
        let emitter = EventEmitter::new();
        emitter.emit(Event::Connected);
    }
}

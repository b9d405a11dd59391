//! Progress events emitted while joining a launch
//!
//! Events are delivered in emission order to an [`EventSink`]. The sink is an
//! injected collaborator; the join flow never waits for an acknowledgment.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ongoing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub status: Status,
    pub message: String,
}

impl Event {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Event {
            status,
            message: message.into(),
        }
    }

    pub fn ongoing(message: impl Into<String>) -> Self {
        Event::new(Status::Ongoing, message)
    }

    pub fn done(message: impl Into<String>) -> Self {
        Event::new(Status::Done, message)
    }

    pub fn is_ongoing(&self) -> bool {
        self.status == Status::Ongoing
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.status {
            Status::Ongoing => write!(f, "… {}", self.message),
            Status::Done => write!(f, "✔ {}", self.message),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn send(&self, event: Event);
}

/// Forwards events over a channel to a consumer on another thread.
#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
}

impl EventBus {
    /// Creates a bus and the receiving end. The receiver drains once every
    /// clone of the bus has been dropped.
    pub fn new() -> (Self, Receiver<Event>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (EventBus { tx }, rx)
    }
}

impl EventSink for EventBus {
    fn send(&self, event: Event) {
        // receiver gone means nobody is displaying progress
        let _ = self.tx.send(event);
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl EventSink for Discard {
    fn send(&self, _event: Event) {}
}

/// Mirrors events into the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn send(&self, event: Event) {
        match event.status {
            Status::Ongoing => tracing::info!(status = "ongoing", "{}", event.message),
            Status::Done => tracing::info!(status = "done", "{}", event.message),
        }
    }
}

/// Keeps every event in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for Recorder {
    fn send(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_preserves_order() {
        let (bus, rx) = EventBus::new();
        bus.send(Event::ongoing("first"));
        bus.send(Event::done("second"));
        drop(bus);

        let received: Vec<Event> = rx.iter().collect();
        assert_eq!(received, vec![Event::ongoing("first"), Event::done("second")]);
    }

    #[test]
    fn test_bus_without_receiver_does_not_panic() {
        let (bus, rx) = EventBus::new();
        drop(rx);
        bus.send(Event::done("nobody listens"));
    }

    #[test]
    fn test_recorder_clones_share_buffer() {
        let recorder = Recorder::new();
        let sink: Arc<dyn EventSink> = Arc::new(recorder.clone());
        sink.send(Event::ongoing("checking"));
        assert_eq!(recorder.events().len(), 1);
        assert!(recorder.events()[0].is_ongoing());
        recorder.clear();
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Event::done("Transactions broadcasted").to_string(), "✔ Transactions broadcasted");
    }
}

//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Subscriber (one):
//!   Supervisor      ──┐
//!   ChildWatcher x2 ──┼──► Bus ──► subscriber_listener ──► SubscriberSet
//!   SignalListener  ──┘  (broadcast)   (in Supervisor)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_only_later_events() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::GenerationStarting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::RestartScheduled).with_generation(2));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::RestartScheduled);
        assert_eq!(ev.generation, Some(2));
    }
}

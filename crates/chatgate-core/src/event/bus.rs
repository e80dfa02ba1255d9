//! Connection event bus: the session's single-writer, multi-reader view.
//!
//! Two channels back the bus. A `tokio::sync::watch` channel always holds the
//! latest [`SessionSnapshot`], so late readers see current state without
//! replay. A `tokio::sync::broadcast` channel carries discrete
//! [`SessionEvent`]s for streaming consumers. Publishing with no subscribers
//! is a no-op.

use chatgate_types::event::SessionEvent;
use chatgate_types::session::{Challenge, SessionStatus};
use tokio::sync::{broadcast, watch};

/// Status plus the pending challenge, published atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub challenge: Option<Challenge>,
}

/// Write side of the bus. Owned by the session manager only.
pub struct ConnectionEventBus {
    events: broadcast::Sender<SessionEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl ConnectionEventBus {
    /// Create a bus whose event channel buffers `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self { events, snapshot }
    }

    /// Publish a discrete event to current subscribers.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Replace the current snapshot. Succeeds with or without readers.
    pub fn publish_snapshot(&self, snapshot: SessionSnapshot) {
        self.snapshot.send_replace(snapshot);
    }

    /// A read-only handle onto this bus.
    pub fn observer(&self) -> SessionObserver {
        SessionObserver {
            events: self.events.clone(),
            snapshot: self.snapshot.subscribe(),
        }
    }
}

impl std::fmt::Debug for ConnectionEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEventBus")
            .field("receiver_count", &self.events.receiver_count())
            .field("state", &self.snapshot.borrow().status.state)
            .finish()
    }
}

/// Read side of the bus. Cheap to clone; cannot publish.
#[derive(Clone)]
pub struct SessionObserver {
    events: broadcast::Sender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionObserver {
    /// Receive all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.snapshot.borrow().status.clone()
    }

    pub fn challenge(&self) -> Option<Challenge> {
        self.snapshot.borrow().challenge.clone()
    }

    /// Wait until the status satisfies `predicate` and return it.
    ///
    /// Returns `None` if the bus was dropped first.
    pub async fn wait_for(&self, predicate: impl Fn(&SessionStatus) -> bool) -> Option<SessionStatus> {
        let mut rx = self.snapshot.clone();
        rx.wait_for(|snapshot| predicate(&snapshot.status))
            .await
            .ok()
            .map(|snapshot| snapshot.status.clone())
    }
}

impl std::fmt::Debug for SessionObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionObserver")
            .field("state", &self.snapshot.borrow().status.state)
            .finish()
    }
}

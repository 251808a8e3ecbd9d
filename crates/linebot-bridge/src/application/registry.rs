//! Registry of connected client sinks and the broadcast fan-out.
//!
//! Each WebSocket session owns a bounded channel whose receiving end is
//! drained by that session's writer task.  The registry only holds the
//! sending ends, so a broadcast is a loop of non-blocking `try_send` calls:
//!
//! ```text
//!                      ┌─► ClientSink ─► [chan] ─► writer task ─► WebSocket A
//! Relay ─► broadcast ──┼─► ClientSink ─► [chan] ─► writer task ─► WebSocket B
//!                      └─► ClientSink ─► [chan] ─► writer task ─► WebSocket C
//! ```
//!
//! A full channel drops that one message for that one client.  A closed
//! channel (the session ended) removes the sink on the spot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Identifies one registered sink for its whole lifetime.
pub type SinkId = Uuid;

/// Sending half of one client's outbound message channel.
///
/// Messages are shared `Arc<str>` so a broadcast serializes once and every
/// client gets a pointer copy.
#[derive(Debug, Clone)]
pub struct ClientSink {
    tx: mpsc::Sender<Arc<str>>,
}

impl ClientSink {
    /// Creates a sink and the receiver its writer task drains.
    ///
    /// `buffer` is clamped to at least 1.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    /// Queues a direct reply, waiting for room if the channel is full.
    ///
    /// Returns `false` if the session has already gone away.
    pub async fn send(&self, message: Arc<str>) -> bool {
        self.tx.send(message).await.is_ok()
    }
}

/// Outcome of one [`ClientRegistry::broadcast`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sinks that accepted the message.
    pub delivered: usize,
    /// Sinks whose channel was full; they missed this message but stay
    /// registered.
    pub lagged: usize,
    /// Sinks found closed and removed during this pass.
    pub removed: Vec<SinkId>,
}

/// Thread-safe set of connected client sinks.
///
/// All access goes through one mutex, so a broadcast never observes a
/// half-registered or half-removed sink.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    sinks: Mutex<HashMap<SinkId, ClientSink>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink and returns the id it was registered under.
    pub fn register(&self, sink: ClientSink) -> SinkId {
        let id = Uuid::new_v4();
        self.lock().insert(id, sink);
        id
    }

    /// Removes a sink.  Returns `false` if it was not (or no longer) present.
    pub fn unregister(&self, id: SinkId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn contains(&self, id: SinkId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Offers `message` to every registered sink without blocking.
    ///
    /// Closed sinks are removed in the same pass.
    pub fn broadcast(&self, message: &Arc<str>) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        self.lock()
            .retain(|id, sink| match sink.tx.try_send(Arc::clone(message)) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    report.lagged += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    report.removed.push(*id);
                    false
                }
            });

        report
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SinkId, ClientSink>> {
        // The map stays consistent even if a holder panicked.
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

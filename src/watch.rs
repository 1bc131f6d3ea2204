//! Live watch streams.
//!
//! In-process fan-out of accepted events to per-case subscribers, the
//! embedded counterpart of pushing events to connected devices.
//! Publishing never blocks the append path: a subscriber whose buffer is
//! full loses that event and the hub counts the drop. Transport and
//! redelivery belong to outer layers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::warn;

use crate::case::CaseId;
use crate::event::Envelope;

struct Subscriber {
    id: u64,
    tx: Sender<Envelope>,
}

/// Per-case subscription registry.
pub struct WatchHub {
    capacity: usize,
    next_id: AtomicU64,
    dropped: AtomicU64,
    inner: RwLock<HashMap<CaseId, Vec<Subscriber>>>,
}

impl WatchHub {
    /// Creates a hub whose subscriber buffers hold `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribes to a case's accepted events. Dropping the returned
    /// stream unsubscribes lazily: the hub prunes disconnected
    /// subscribers on the next publish.
    pub fn subscribe(&self, case_id: CaseId) -> WatchStream {
        let (tx, rx) = bounded(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut state) = self.inner.write() {
            state.entry(case_id).or_default().push(Subscriber { id, tx });
        }
        WatchStream { rx }
    }

    /// Publishes an envelope to every subscriber of its case.
    pub fn publish(&self, envelope: &Envelope) {
        let Ok(mut state) = self.inner.write() else {
            return;
        };
        let Some(subscribers) = state.get_mut(&envelope.case_id) else {
            return;
        };

        let mut disconnected: Vec<u64> = Vec::new();
        for sub in subscribers.iter() {
            match sub.tx.try_send(envelope.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(case = %envelope.case_id, subscriber = sub.id, "watch buffer full, event dropped");
                }
                Err(TrySendError::Disconnected(_)) => disconnected.push(sub.id),
            }
        }

        if !disconnected.is_empty() {
            subscribers.retain(|s| !disconnected.contains(&s.id));
            if subscribers.is_empty() {
                state.remove(&envelope.case_id);
            }
        }
    }

    /// Events dropped because a subscriber buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A subscriber's view of a case's accepted events.
pub struct WatchStream {
    rx: Receiver<Envelope>,
}

impl WatchStream {
    /// Non-blocking poll.
    #[must_use]
    pub fn try_recv(&self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Blocking receive with a timeout.
    ///
    /// # Errors
    ///
    /// Returns the underlying channel error on timeout or when the hub
    /// is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Envelope, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

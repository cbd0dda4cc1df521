//! Event bus: fan-out of typed events to per-subscriber bounded channels.
//!
//! Each subscriber owns a bounded mpsc receiver; delivery order to any one
//! subscriber matches emission order. `emit` awaits channel capacity so the
//! core path never drops events; `try_emit` is the non-suspending variant
//! for best-effort mirrors and reports whether every subscriber accepted.

use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::trace;
use troika_common::AgentEvent;

pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Receiving side of a bus subscription.
pub struct BusReceiver {
    rx: mpsc::Receiver<AgentEvent>,
}

impl BusReceiver {
    /// Next event, or `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<AgentEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<AgentEvent> {
        self.rx.try_recv().ok()
    }
}

/// Single fan-out event bus.
pub struct EventBus {
    capacity: usize,
    senders: Mutex<Vec<mpsc::Sender<AgentEvent>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber. Every event emitted after this call is
    /// delivered to the returned receiver.
    pub fn subscribe(&self) -> BusReceiver {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders.lock().unwrap().push(tx);
        BusReceiver { rx }
    }

    /// Deliver the event to all active subscribers, awaiting capacity on
    /// each channel. Closed subscribers are pruned.
    pub async fn emit(&self, event: AgentEvent) {
        trace!(event_type = event.event_type(), "Emitting event");
        let senders: Vec<mpsc::Sender<AgentEvent>> =
            self.senders.lock().unwrap().clone();

        let mut saw_closed = false;
        for sender in &senders {
            if sender.send(event.clone()).await.is_err() {
                saw_closed = true;
            }
        }
        if saw_closed {
            self.senders.lock().unwrap().retain(|s| !s.is_closed());
        }
    }

    /// Non-suspending emit. Returns true only if every active subscriber
    /// accepted the event; a full or closed channel drops it for that
    /// subscriber.
    pub fn try_emit(&self, event: AgentEvent) -> bool {
        let mut all_accepted = true;
        let mut saw_closed = false;
        {
            let senders = self.senders.lock().unwrap();
            for sender in senders.iter() {
                match sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => all_accepted = false,
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        all_accepted = false;
                        saw_closed = true;
                    }
                }
            }
        }
        if saw_closed {
            self.senders.lock().unwrap().retain(|s| !s.is_closed());
        }
        all_accepted
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().unwrap().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

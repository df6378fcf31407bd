use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::prelude::DetectionFrame;

pub const DEFAULT_OBSERVER_QUEUE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Receiving end handed to an observer; yields serialized frames in order.
pub type ObserverReceiver = mpsc::Receiver<Arc<str>>;

pub struct BroadcastHub {
    observers: RwLock<HashMap<ObserverId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OBSERVER_QUEUE)
    }

    pub fn with_capacity(queue_capacity: usize) -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn register(&self) -> (ObserverId, ObserverReceiver) {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.observers.write().insert(id, tx);
        info!("{} connected ({} active)", id, self.observer_count());
        (id, rx)
    }

    pub fn unregister(&self, id: ObserverId) {
        if self.observers.write().remove(&id).is_some() {
            info!("{} disconnected", id);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Offers `frame` to every observer; returns how many accepted it.
    ///
    /// Failed observers are removed. Errors never reach the caller.
    pub fn broadcast(&self, frame: &DetectionFrame) -> BroadcastOutcome {
        let payload: Arc<str> = match serde_json::to_string(frame) {
            Ok(json) => json.into(),
            Err(err) => {
                error!("failed to serialize detection frame: {}", err);
                return BroadcastOutcome::default();
            }
        };
        self.broadcast_payload(payload)
    }

    pub fn broadcast_payload(&self, payload: Arc<str>) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        let mut failed = Vec::new();
        {
            let observers = self.observers.read();
            for (id, tx) in observers.iter() {
                match tx.try_send(Arc::clone(&payload)) {
                    Ok(()) => outcome.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!("{} is not keeping up, dropping it", id);
                        failed.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("{} went away", id);
                        failed.push(*id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut observers = self.observers.write();
            for id in &failed {
                observers.remove(id);
            }
            outcome.dropped = failed.len();
        }
        outcome
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub dropped: usize,
}

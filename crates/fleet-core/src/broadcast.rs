//! Subscriber registry and event fan-out.
//!
//! Each subscriber is a bounded queue. [`Broadcaster::broadcast`] pushes one
//! event into every queue as an independent delivery with a bounded wait; a
//! subscriber whose queue is closed or stays full past the wait is removed
//! from the registry. Failures never reach the caller, only the
//! [`BroadcastReport`].
//!
//! Broadcasts are serialized, so two events broadcast one after the other
//! land in every surviving queue in that order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use fleet_types::LiveEvent;
use futures::future::join_all;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::BroadcastConfig;

/// Identifier of one live subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// A fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a delivery failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    /// The receiving half was dropped.
    #[error("subscriber disconnected")]
    Disconnected,

    /// The queue stayed full past the delivery timeout.
    #[error("subscriber queue full")]
    Lagging,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers that accepted the event.
    pub delivered: usize,
    /// Subscribers removed because delivery failed.
    pub dropped: Vec<SubscriberId>,
}

/// The receiving side of a subscription, drained by a transport task.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<LiveEvent>>,
}

impl Subscription {
    /// This subscriber's id, for [`Broadcaster::unregister`].
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event. `None` once the subscriber was dropped from
    /// the registry and the queue is drained.
    pub async fn recv(&mut self) -> Option<Arc<LiveEvent>> {
        self.rx.recv().await
    }

    /// Take the next event if one is queued.
    pub fn try_recv(&mut self) -> Option<Arc<LiveEvent>> {
        self.rx.try_recv().ok()
    }
}

type Sink = mpsc::Sender<Arc<LiveEvent>>;

/// Registry of live subscribers and the fan-out over them.
#[derive(Debug)]
pub struct Broadcaster {
    subscribers: RwLock<HashMap<SubscriberId, Sink>>,
    /// Held for the whole of a broadcast to keep events ordered.
    delivery: Mutex<()>,
    buffer: usize,
    delivery_timeout: Duration,
}

impl Broadcaster {
    /// Create an empty registry.
    pub fn new(config: &BroadcastConfig) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            delivery: Mutex::new(()),
            buffer: config.subscriber_buffer.max(1),
            delivery_timeout: config.delivery_timeout(),
        }
    }

    /// Create a subscriber queue, register it, and return its receiving half.
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = SubscriberId::new();
        self.register(id, tx).await;
        Subscription { id, rx }
    }

    /// Register an existing sink. Returns `false` if the id is already
    /// registered, in which case the existing sink is kept.
    pub async fn register(&self, id: SubscriberId, sink: Sink) -> bool {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.contains_key(&id) {
            return false;
        }
        subscribers.insert(id, sink);
        debug!(subscriber = %id, total = subscribers.len(), "Subscriber registered");
        true
    }

    /// Remove a subscriber. Unknown ids are ignored. Returns whether
    /// anything was removed.
    pub async fn unregister(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let removed = subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, total = subscribers.len(), "Subscriber unregistered");
        }
        removed
    }

    /// Whether a subscriber is currently registered.
    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().await.contains_key(&id)
    }

    /// Number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Deliver an event to every registered subscriber.
    ///
    /// Each delivery runs on its own and waits at most the configured
    /// delivery timeout (no wait at all when it is zero). Subscribers that
    /// fail are unregistered before this returns.
    pub async fn broadcast(&self, event: LiveEvent) -> BroadcastReport {
        let _ordered = self.delivery.lock().await;

        let targets: Vec<(SubscriberId, Sink)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, sink)| (*id, sink.clone()))
            .collect();
        if targets.is_empty() {
            return BroadcastReport::default();
        }

        let event = Arc::new(event);
        let timeout = self.delivery_timeout;
        let outcomes = join_all(targets.iter().map(|(id, sink)| {
            let event = Arc::clone(&event);
            async move { (*id, deliver(sink, event, timeout).await) }
        }))
        .await;

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered = report.delivered.saturating_add(1),
                Err(failure) => failed.push((id, failure)),
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for (id, failure) in failed {
                subscribers.remove(&id);
                warn!(subscriber = %id, reason = %failure, kind = event.kind(), "Dropping subscriber");
                report.dropped.push(id);
            }
        }

        debug!(
            kind = event.kind(),
            delivered = report.delivered,
            dropped = report.dropped.len(),
            "Event broadcast"
        );
        report
    }
}

async fn deliver(
    sink: &Sink,
    event: Arc<LiveEvent>,
    timeout: Duration,
) -> Result<(), DeliveryFailure> {
    if timeout.is_zero() {
        return sink.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryFailure::Lagging,
            TrySendError::Closed(_) => DeliveryFailure::Disconnected,
        });
    }
    sink.send_timeout(event, timeout).await.map_err(|e| match e {
        SendTimeoutError::Timeout(_) => DeliveryFailure::Lagging,
        SendTimeoutError::Closed(_) => DeliveryFailure::Disconnected,
    })
}

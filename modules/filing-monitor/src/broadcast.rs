//! Fan-out of lifecycle events to live subscribers.
//!
//! Each subscriber owns a bounded channel. Publishing never waits: a
//! subscriber whose channel is closed or full is dropped from the registry
//! and the rest still receive the event.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use filing_common::LifecycleEvent;

use crate::traits::EventSink;

/// Events buffered per subscriber before it counts as stalled.
const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

pub type SubscriberId = u64;

struct Registry {
    next_id: AtomicU64,
    buffer: usize,
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<LifecycleEvent>>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<LifecycleEvent>>> {
        // A panic while holding the lock leaves the map itself intact.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: SubscriberId) -> bool {
        self.lock().remove(&id).is_some()
    }
}

/// Cloneable handle to the subscriber registry.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a new subscriber. Dropping the returned handle unregisters it.
    pub fn subscribe(&self) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.registry.buffer);
        self.registry.lock().insert(id, tx);
        debug!(subscriber = id, "Subscriber registered");

        Subscription {
            id,
            receiver: rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            debug!(subscriber = id, "Subscriber removed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Drop every subscriber. Their receivers drain what is buffered and then
    /// end, which lets long-lived streams finish during shutdown.
    pub fn close_all(&self) -> usize {
        let mut subscribers = self.registry.lock();
        let count = subscribers.len();
        subscribers.clear();
        count
    }

    /// Deliver `event` to every registered subscriber. Returns how many
    /// received it.
    ///
    /// The registry lock is held across the whole send loop, so subscribers
    /// see events in publish order and a concurrent unsubscribe lands either
    /// before or after this event, never halfway.
    pub fn publish(&self, event: &LifecycleEvent) -> usize {
        let mut subscribers = self.registry.lock();
        let mut delivered = 0;

        subscribers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = *id, "Subscriber disconnected, removing");
                false
            }
            Err(TrySendError::Full(_)) => {
                debug!(subscriber = *id, "Subscriber stalled, removing");
                false
            }
        });

        delivered
    }
}

impl EventSink for Broadcaster {
    fn publish(&self, event: &LifecycleEvent) {
        Broadcaster::publish(self, event);
    }
}

/// A live subscription. Events arrive through [`Subscription::recv`].
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<LifecycleEvent>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event, or `None` once the subscriber has been removed and the
    /// buffer is drained.
    pub async fn recv(&mut self) -> Option<LifecycleEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<LifecycleEvent> {
        self.receiver.try_recv().ok()
    }

    /// Stop accepting events without unregistering. The next publish
    /// notices the closed channel and drops this subscriber.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(message: &str) -> LifecycleEvent {
        LifecycleEvent::finished_checking(message)
    }

    #[test]
    fn closed_subscriber_is_removed_and_others_still_receive() {
        let broadcaster = Broadcaster::new();
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        let mut third = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 3);

        second.close();
        let delivered = broadcaster.publish(&event("No new filings found"));

        assert_eq!(delivered, 2);
        assert_eq!(broadcaster.subscriber_count(), 2);
        assert_eq!(first.try_recv().unwrap().message, "No new filings found");
        assert_eq!(third.try_recv().unwrap().message, "No new filings found");
        assert!(second.try_recv().is_none());

        // The survivors keep receiving.
        assert_eq!(broadcaster.publish(&event("again")), 2);
        assert_eq!(first.try_recv().unwrap().message, "again");
    }

    #[test]
    fn dropping_a_subscription_unregisters_it() {
        let broadcaster = Broadcaster::new();
        let kept = broadcaster.subscribe();
        {
            let _temporary = broadcaster.subscribe();
            assert_eq!(broadcaster.subscriber_count(), 2);
        }
        assert_eq!(broadcaster.subscriber_count(), 1);
        assert!(broadcaster.unsubscribe(kept.id()));
        assert!(!broadcaster.unsubscribe(kept.id()));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn stalled_subscriber_is_dropped() {
        let broadcaster = Broadcaster::with_buffer(2);
        let mut slow = broadcaster.subscribe();
        let mut fast = broadcaster.subscribe();

        for i in 0..2 {
            assert_eq!(broadcaster.publish(&event(&format!("e{i}"))), 2);
            fast.try_recv().unwrap();
        }
        // `slow` never read, so its buffer is full now.
        assert_eq!(broadcaster.publish(&event("e2")), 1);
        assert_eq!(broadcaster.subscriber_count(), 1);

        assert_eq!(fast.try_recv().unwrap().message, "e2");
        assert_eq!(slow.try_recv().unwrap().message, "e0");
    }

    #[test]
    fn publish_with_no_subscribers_is_a_no_op() {
        let broadcaster = Broadcaster::new();
        assert_eq!(broadcaster.publish(&event("nobody listening")), 0);
    }

    #[tokio::test]
    async fn close_all_ends_subscriptions_after_buffered_events() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe();
        broadcaster.publish(&event("last one"));

        assert_eq!(broadcaster.close_all(), 1);
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(sub.recv().await.unwrap().message, "last one");
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe();

        for message in ["one", "two", "three"] {
            broadcaster.publish(&event(message));
        }

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(sub.recv().await.unwrap().message);
        }
        assert_eq!(received, vec!["one", "two", "three"]);
    }
}

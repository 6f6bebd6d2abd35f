//! Public hub handle
//!
//! [`Hub`] is a cheap, cloneable front for the coordinator task. None of its
//! methods wait on subscribers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::stats::HubStats;

use super::actor::{Command, HubActor, Inbound};
use super::config::HubConfig;
use super::event::{ChangeEvent, ChangeSink, Notification};
use super::subscriber::{Subscriber, SubscriberId};

/// Handle to the notification hub
#[derive(Clone)]
pub struct Hub {
    control: mpsc::UnboundedSender<Command>,
    inbox: mpsc::Sender<Inbound>,
    shed: Arc<AtomicU64>,
    next_id: Arc<AtomicU64>,
    config: HubConfig,
}

impl Hub {
    /// Spawn a hub with default configuration
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Spawn a hub with custom configuration
    ///
    /// The coordinator task runs until every `Hub` clone and every
    /// [`Subscriber`] has been dropped.
    pub fn with_config(config: HubConfig) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::channel(config.inbox_capacity.max(1));
        let shed = Arc::new(AtomicU64::new(0));
        tokio::spawn(HubActor::new(control_rx, inbox_rx, Arc::clone(&shed)).run());

        Self {
            control: control_tx,
            inbox: inbox_tx,
            shed,
            next_id: Arc::new(AtomicU64::new(1)),
            config,
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new subscriber
    ///
    /// The subscriber is admitted before any later `publish` is processed.
    pub fn register(&self) -> Result<Subscriber> {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.subscriber_capacity.max(1));
        let closed = Arc::new(AtomicBool::new(false));

        self.control
            .send(Command::Register {
                id,
                tx,
                closed: Arc::clone(&closed),
            })
            .map_err(|_| Error::HubClosed)?;

        Ok(Subscriber::new(id, rx, closed, self.control.clone()))
    }

    /// Unregister a subscriber by ID
    ///
    /// Idempotent. Returns whether the subscriber was still registered. Once
    /// this returns, the subscriber's handle yields nothing more, not even
    /// notifications that were already queued.
    pub async fn unregister(&self, id: SubscriberId) -> Result<bool> {
        let (ack, done) = oneshot::channel();
        self.control
            .send(Command::Unregister { id, ack: Some(ack) })
            .map_err(|_| Error::HubClosed)?;

        done.await.map_err(|_| Error::HubClosed)
    }

    /// Submit a change event for fan-out
    ///
    /// Never blocks and never fails from the caller's point of view;
    /// delivery problems stay inside the hub. If the coordinator is so far
    /// behind that its inbox is full, the event is shed and counted.
    pub fn publish(&self, event: ChangeEvent) {
        use mpsc::error::TrySendError;

        let notification = match Notification::encode(&event) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(entry = %event.key, error = %e, "Failed to encode change event");
                return;
            }
        };

        match self.inbox.try_send(Inbound::Publish(notification)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let shed = self.shed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(entry = %event.key, shed, "Hub inbox full, change event shed");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(entry = %event.key, "Hub closed, change event discarded");
            }
        }
    }

    /// Get hub statistics
    ///
    /// The snapshot covers every change event published before the call.
    pub async fn stats(&self) -> Result<HubStats> {
        let (reply, done) = oneshot::channel();
        self.inbox
            .send(Inbound::Stats(reply))
            .await
            .map_err(|_| Error::HubClosed)?;

        done.await.map_err(|_| Error::HubClosed)
    }
}

impl ChangeSink for Hub {
    fn publish(&self, event: ChangeEvent) {
        Hub::publish(self, event);
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;
    use tokio_test::assert_ok;

    use super::*;
    use crate::hub::ChangeKind;
    use crate::registry::EntryKey;

    fn inserted(code: &str, no: u32) -> ChangeEvent {
        ChangeEvent::new(EntryKey::new(code, no), ChangeKind::Inserted)
    }

    async fn recv_class(sub: &mut Subscriber) -> String {
        let n = timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("subscriber closed");
        n.class_code
    }

    #[tokio::test]
    async fn test_register_publish_receive() {
        let hub = Hub::spawn();
        let mut a = assert_ok!(hub.register());
        let mut b = assert_ok!(hub.register());
        assert_ne!(a.id(), b.id());

        hub.publish(inserted("1A", 5));

        assert_eq!(recv_class(&mut a).await, "1A");
        assert_eq!(recv_class(&mut b).await, "1A");

        let stats = assert_ok!(hub.stats().await);
        assert_eq!(stats.subscribers, 2);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.delivered, 2);
    }

    #[tokio::test]
    async fn test_unregistered_subscriber_gets_nothing() {
        let hub = Hub::spawn();
        let mut stays = assert_ok!(hub.register());
        let leaves = assert_ok!(hub.register());
        let leaves_id = leaves.id();

        assert!(leaves.unregister().await);
        hub.publish(inserted("2B", 1));

        assert_eq!(recv_class(&mut stays).await, "2B");
        // Unregistering again is a no-op
        assert!(!assert_ok!(hub.unregister(leaves_id).await));

        let stats = assert_ok!(hub.stats().await);
        assert_eq!(stats.subscribers, 1);
        assert_eq!(stats.delivered, 1);
    }

    #[tokio::test]
    async fn test_unregister_by_id_is_idempotent() {
        let hub = Hub::spawn();
        let sub = assert_ok!(hub.register());
        let id = sub.id();

        assert!(assert_ok!(hub.unregister(id).await));
        assert!(!assert_ok!(hub.unregister(id).await));
        // Dropping the handle afterwards is harmless
        drop(sub);

        let stats = assert_ok!(hub.stats().await);
        assert_eq!(stats.subscribers, 0);
    }

    #[tokio::test]
    async fn test_unregister_by_id_discards_queued_notifications() {
        let hub = Hub::spawn();
        let mut sub = assert_ok!(hub.register());

        hub.publish(inserted("1A", 5));
        // Stats are answered after the publish, so the notification is queued
        assert_eq!(assert_ok!(hub.stats().await).delivered, 1);
        assert_eq!(sub.pending(), 1);

        assert!(assert_ok!(hub.unregister(sub.id()).await));

        assert!(sub.is_closed());
        assert!(sub.try_recv().is_none());
        let next = timeout(Duration::from_secs(1), sub.recv()).await;
        assert!(matches!(next, Ok(None)));
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let hub = Hub::with_config(HubConfig {
            subscriber_capacity: 0,
            inbox_capacity: 0,
        });
        let mut sub = assert_ok!(hub.register());

        hub.publish(inserted("1A", 1));

        assert_eq!(recv_class(&mut sub).await, "1A");
    }

    #[tokio::test]
    async fn test_full_inbox_sheds_without_blocking() {
        // The coordinator cannot run until this task yields, so the inbox
        // fills up deterministically on the current-thread runtime
        let hub = Hub::with_config(HubConfig::default().inbox_capacity(4));
        let _sub = assert_ok!(hub.register());

        for no in 1..=10 {
            hub.publish(inserted("5E", no));
        }

        let stats = assert_ok!(hub.stats().await);
        assert_eq!(stats.published, 4);
        assert_eq!(stats.shed, 6);
        assert_eq!(stats.delivered, 4);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let hub = Hub::spawn();
        let sub = assert_ok!(hub.register());
        drop(sub);

        let stats = assert_ok!(hub.stats().await);
        assert_eq!(stats.subscribers, 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_newest_without_blocking_others() {
        let hub = Hub::with_config(HubConfig::default().subscriber_capacity(2));
        let mut slow = assert_ok!(hub.register());
        let mut fast = assert_ok!(hub.register());

        for no in 1..=5 {
            hub.publish(inserted("1A", no));
        }

        // The fast subscriber drains everything it is sent
        let mut fast_received = 0;
        for _ in 1..=2 {
            recv_class(&mut fast).await;
            fast_received += 1;
        }

        let stats = assert_ok!(hub.stats().await);
        assert_eq!(stats.published, 5);
        // Each subscriber's queue holds 2, the remaining 3 per subscriber are dropped
        assert_eq!(stats.delivered, 4);
        assert_eq!(stats.dropped, 6);
        assert_eq!(fast_received, 2);

        // The slow subscriber kept the oldest notifications
        let first = slow.try_recv().unwrap();
        assert!(first.payload.windows(11).any(|w| w == b"\"classno\":1"));
        assert!(slow.try_recv().is_some());
        assert!(slow.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_fast_subscriber_unaffected_by_stalled_one() {
        let hub = Hub::with_config(HubConfig::default().subscriber_capacity(1));
        let _stalled = assert_ok!(hub.register());
        let mut fast = assert_ok!(hub.register());

        for no in 1..=20 {
            hub.publish(inserted("3C", no));
            assert_eq!(recv_class(&mut fast).await, "3C");
        }

        let stats = assert_ok!(hub.stats().await);
        assert_eq!(stats.delivered, 21);
        assert_eq!(stats.dropped, 19);
    }

    #[tokio::test]
    async fn test_dead_subscriber_is_evicted() {
        let hub = Hub::spawn();
        let (tx, rx) = mpsc::channel(4);
        let id = SubscriberId(999);
        // Simulate a connection whose receiver vanished without unregistering
        let closed = Arc::new(AtomicBool::new(false));
        let register = Command::Register {
            id,
            tx,
            closed: Arc::clone(&closed),
        };
        assert!(hub.control.send(register).is_ok());
        drop(rx);

        hub.publish(inserted("4D", 1));

        let stats = assert_ok!(hub.stats().await);
        assert_eq!(stats.subscribers, 0);
        assert_eq!(stats.evicted, 1);
        assert!(closed.load(Ordering::Acquire));
    }
}

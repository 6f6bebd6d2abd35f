//! Subscriber handles
//!
//! A [`Subscriber`] is one viewer's outbound channel. It owns the receiving
//! half of a bounded queue that only the hub writes to. Dropping the handle
//! unregisters it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::actor::Command;
use super::event::Notification;

/// Identity of a subscriber, unique for the lifetime of the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(super) u64);

impl SubscriberId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving end of one viewer's notification queue
pub struct Subscriber {
    id: SubscriberId,
    rx: mpsc::Receiver<Notification>,
    /// Set by the hub when it forgets this subscriber
    closed: Arc<AtomicBool>,
    commands: mpsc::UnboundedSender<Command>,
    registered: bool,
}

impl Subscriber {
    pub(super) fn new(
        id: SubscriberId,
        rx: mpsc::Receiver<Notification>,
        closed: Arc<AtomicBool>,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        Self {
            id,
            rx,
            closed,
            commands,
            registered: true,
        }
    }

    /// Get the subscriber ID
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether the hub has removed this subscriber
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait for the next notification
    ///
    /// Returns `None` once the hub has removed this subscriber. Notifications
    /// still queued at that point are discarded.
    pub async fn recv(&mut self) -> Option<Notification> {
        if self.is_closed() {
            return None;
        }
        let notification = self.rx.recv().await?;
        (!self.is_closed()).then_some(notification)
    }

    /// Take a queued notification without waiting
    pub fn try_recv(&mut self) -> Option<Notification> {
        if self.is_closed() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Number of notifications waiting in the queue
    pub fn pending(&self) -> usize {
        if self.is_closed() {
            0
        } else {
            self.rx.len()
        }
    }

    /// Unregister and wait until the hub has forgotten this subscriber
    ///
    /// Returns false if the hub had already removed it (or has stopped).
    /// Anything still queued is discarded.
    pub async fn unregister(mut self) -> bool {
        self.registered = false;
        self.closed.store(true, Ordering::Release);
        self.rx.close();

        let (ack, done) = oneshot::channel();
        let sent = self.commands.send(Command::Unregister {
            id: self.id,
            ack: Some(ack),
        });

        match sent {
            Ok(()) => done.await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        if self.registered {
            let _ = self.commands.send(Command::Unregister {
                id: self.id,
                ack: None,
            });
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("pending", &self.pending())
            .finish()
    }
}

//! Hub coordinator task
//!
//! The subscriber set lives inside a single task. Membership changes arrive
//! on an unbounded control queue; change events and stats requests arrive on
//! a bounded inbox. Before every inbox item the control queue is drained, so
//! a subscriber registered before a publish always sees it and one
//! unregistered before a publish never does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::stats::HubStats;

use super::event::Notification;
use super::subscriber::SubscriberId;

/// Membership commands
pub(super) enum Command {
    /// Admit a subscriber with its outbound queue
    Register {
        id: SubscriberId,
        tx: mpsc::Sender<Notification>,
        closed: Arc<AtomicBool>,
    },
    /// Remove a subscriber; acknowledges whether it was still registered
    Unregister {
        id: SubscriberId,
        ack: Option<oneshot::Sender<bool>>,
    },
}

/// Items processed in publish order
pub(super) enum Inbound {
    /// Fan a notification out to every current subscriber
    Publish(Notification),
    /// Report statistics covering every earlier publish
    Stats(oneshot::Sender<HubStats>),
}

/// The hub's side of one subscriber
struct Outbound {
    tx: mpsc::Sender<Notification>,
    closed: Arc<AtomicBool>,
}

impl Outbound {
    /// Cut the subscriber off, including anything already queued to it
    fn close(self) {
        self.closed.store(true, Ordering::Release);
    }
}

pub(super) struct HubActor {
    control: mpsc::UnboundedReceiver<Command>,
    inbox: mpsc::Receiver<Inbound>,
    subscribers: HashMap<SubscriberId, Outbound>,
    shed: Arc<AtomicU64>,
    stats: HubStats,
}

impl HubActor {
    pub(super) fn new(
        control: mpsc::UnboundedReceiver<Command>,
        inbox: mpsc::Receiver<Inbound>,
        shed: Arc<AtomicU64>,
    ) -> Self {
        Self {
            control,
            inbox,
            subscribers: HashMap::new(),
            shed,
            stats: HubStats::new(),
        }
    }

    /// Process commands until every hub handle and subscriber is gone
    pub(super) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                command = self.control.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(inbound) = self.inbox.recv() => {
                    self.drain_control();
                    self.process(inbound);
                }
            }
        }

        tracing::debug!(
            subscribers = self.subscribers.len(),
            published = self.stats.published,
            "Hub stopped"
        );
    }

    fn drain_control(&mut self) {
        while let Ok(command) = self.control.try_recv() {
            self.handle(command);
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register { id, tx, closed } => {
                self.subscribers.insert(id, Outbound { tx, closed });
                tracing::info!(
                    subscriber_id = %id,
                    subscribers = self.subscribers.len(),
                    "Subscriber registered"
                );
            }
            Command::Unregister { id, ack } => {
                let removed = match self.subscribers.remove(&id) {
                    Some(outbound) => {
                        outbound.close();
                        true
                    }
                    None => false,
                };
                if removed {
                    tracing::info!(
                        subscriber_id = %id,
                        subscribers = self.subscribers.len(),
                        "Subscriber unregistered"
                    );
                }
                if let Some(ack) = ack {
                    let _ = ack.send(removed);
                }
            }
        }
    }

    fn process(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Publish(notification) => self.fan_out(notification),
            Inbound::Stats(reply) => {
                let mut stats = self.stats;
                stats.subscribers = self.subscribers.len();
                stats.shed = self.shed.load(Ordering::Relaxed);
                let _ = reply.send(stats);
            }
        }
    }

    /// Offer a notification to every subscriber without waiting on any of them
    fn fan_out(&mut self, notification: Notification) {
        use mpsc::error::TrySendError;

        self.stats.published += 1;
        let mut dead = Vec::new();

        for (id, outbound) in &self.subscribers {
            match outbound.tx.try_send(notification.clone()) {
                Ok(()) => self.stats.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    // Drop-newest: the subscriber keeps what it already has queued
                    self.stats.dropped += 1;
                    tracing::debug!(
                        subscriber_id = %id,
                        class_code = %notification.class_code,
                        "Subscriber queue full, notification dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => dead.push(*id),
            }
        }

        for id in dead {
            if let Some(outbound) = self.subscribers.remove(&id) {
                outbound.close();
            }
            self.stats.evicted += 1;
            tracing::warn!(
                subscriber_id = %id,
                subscribers = self.subscribers.len(),
                "Subscriber connection gone, unregistered"
            );
        }
    }
}

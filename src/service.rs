//! Request dispatch
//!
//! [`LineupService`] wires the registry to the hub. Every committed mutation
//! is published to the hub by the registry itself, after the backend write
//! and under the entry's lock, so a viewer that re-queries after a
//! notification always sees the change that caused it.

use std::sync::Arc;

use crate::error::Result;
use crate::hub::{Hub, Subscriber};
use crate::registry::{
    parse_priority, Entry, EntryKey, Filter, Flag, RegistryError, ScheduleRegistry,
};
use crate::server::message::{Ack, Request, Reply};

/// The queue service: registry plus notification hub
#[derive(Clone)]
pub struct LineupService {
    registry: Arc<ScheduleRegistry>,
    hub: Hub,
}

impl LineupService {
    /// Create a service, attaching the hub as the registry's change sink
    pub fn new(registry: ScheduleRegistry, hub: Hub) -> Self {
        let registry = registry.with_sink(Arc::new(hub.clone()));
        Self {
            registry: Arc::new(registry),
            hub,
        }
    }

    /// Get the registry
    pub fn registry(&self) -> &Arc<ScheduleRegistry> {
        &self.registry
    }

    /// Get the hub
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// A viewer connected
    pub fn connect(&self) -> Result<Subscriber> {
        self.hub.register()
    }

    /// A viewer disconnected
    pub async fn disconnect(&self, subscriber: Subscriber) {
        let id = subscriber.id();
        if !subscriber.unregister().await {
            tracing::debug!(subscriber_id = %id, "Subscriber was already unregistered");
        }
    }

    pub async fn insert(&self, key: &EntryKey) -> std::result::Result<Ack, RegistryError> {
        self.registry.insert(key).await?;
        Ok(ack(key, format!("{} is added", key), None))
    }

    pub async fn delete(&self, key: &EntryKey) -> std::result::Result<Ack, RegistryError> {
        self.registry.delete(key).await?;
        Ok(ack(key, format!("{} is removed", key), None))
    }

    pub async fn set_priority(
        &self,
        key: &EntryKey,
        priority: i32,
    ) -> std::result::Result<Ack, RegistryError> {
        self.registry.set_priority(key, priority).await?;
        Ok(ack(
            key,
            format!("{}'s priority updated to {}", key, priority),
            None,
        ))
    }

    pub async fn toggle(
        &self,
        key: &EntryKey,
        flag: Flag,
    ) -> std::result::Result<Ack, RegistryError> {
        let value = self.registry.toggle_flag(key, flag).await?;
        Ok(ack(key, format!("{} toggled {}", key, flag), Some(value)))
    }

    pub async fn list(&self, filter: &Filter) -> std::result::Result<Vec<Entry>, RegistryError> {
        self.registry.list(filter).await
    }

    /// Handle one decoded request
    pub async fn dispatch(&self, request: Request) -> Reply {
        match self.try_dispatch(request).await {
            Ok(reply) => reply,
            Err(e) => Reply::from(e),
        }
    }

    async fn try_dispatch(&self, request: Request) -> std::result::Result<Reply, RegistryError> {
        let key = request.key().transpose()?;

        let reply = match (request, key) {
            (Request::Insert { .. }, Some(key)) => Reply::Ack(self.insert(&key).await?),
            (Request::Delete { .. }, Some(key)) => Reply::Ack(self.delete(&key).await?),
            (Request::SetPriority { priority, .. }, Some(key)) => {
                let priority = parse_priority(&priority.as_text())?;
                Reply::Ack(self.set_priority(&key, priority).await?)
            }
            (Request::Toggle { flag, .. }, Some(key)) => {
                let flag: Flag = flag.parse()?;
                Reply::Ack(self.toggle(&key, flag).await?)
            }
            (
                Request::List {
                    class_codes,
                    is_complete,
                    priority,
                },
                _,
            ) => {
                let filter =
                    Filter::parse(class_codes, is_complete.as_deref(), priority.as_deref())?;
                Reply::Entries {
                    entries: self.list(&filter).await?,
                }
            }
            (_, None) => {
                return Err(RegistryError::Validation("request is missing a key".into()));
            }
        };

        Ok(reply)
    }
}

fn ack(key: &EntryKey, message: String, value: Option<bool>) -> Ack {
    Ack {
        key: key.clone(),
        message,
        value,
    }
}

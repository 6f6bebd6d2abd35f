//! Schedule registry implementation
//!
//! The central registry that owns all queue entries, applies mutations with
//! per-entry atomicity and reports committed changes to a [`ChangeSink`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::hub::{ChangeEvent, ChangeKind, ChangeSink};
use crate::stats::RegistryStats;

use super::backend::{EntryBackend, MemoryBackend};
use super::config::RegistryConfig;
use super::entry::{Entry, Flag};
use super::error::RegistryError;
use super::filter::Filter;
use super::key::EntryKey;

/// Serialization point for a single key
///
/// A slot is the unit of locking. `entry` is `None` while a key is being
/// created or after it has been deleted; a retired slot has been unlinked
/// from the map and must not be reused.
struct Slot {
    entry: Option<Entry>,
    retired: bool,
}

impl Slot {
    fn vacant() -> Self {
        Self {
            entry: None,
            retired: false,
        }
    }

    fn occupied(entry: Entry) -> Self {
        Self {
            entry: Some(entry),
            retired: false,
        }
    }
}

type SlotRef = Arc<RwLock<Slot>>;

/// Central registry for all queue entries
///
/// The outer map is only locked long enough to find, create or unlink a slot;
/// all entry work happens under the slot's own lock. Mutations on different
/// keys never wait on each other's slot, and mutations on the same key are
/// applied one at a time.
pub struct ScheduleRegistry {
    /// Map of entry key to its slot
    slots: RwLock<HashMap<EntryKey, SlotRef>>,

    /// Durable write-through backend
    backend: Box<dyn EntryBackend>,

    /// Receiver of committed changes
    sink: Option<Arc<dyn ChangeSink>>,

    /// Configuration
    config: RegistryConfig,
}

impl ScheduleRegistry {
    /// Create an empty in-memory registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty in-memory registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            backend: Box::new(MemoryBackend),
            sink: None,
            config,
        }
    }

    /// Open a registry over a durable backend, loading existing entries
    pub fn open(
        backend: impl EntryBackend + 'static,
        config: RegistryConfig,
    ) -> Result<Self, RegistryError> {
        let entries = backend.load_all().inspect_err(|e| {
            tracing::error!(error = %e, "Failed to load entries from backend");
        })?;

        let slots: HashMap<EntryKey, SlotRef> = entries
            .into_iter()
            .map(|entry| (entry.key.clone(), Arc::new(RwLock::new(Slot::occupied(entry)))))
            .collect();

        tracing::info!(entries = slots.len(), "Registry opened");

        Ok(Self {
            slots: RwLock::new(slots),
            backend: Box::new(backend),
            sink: None,
            config,
        })
    }

    /// Attach the receiver of committed changes
    pub fn with_sink(mut self, sink: Arc<dyn ChangeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// List entries matching a filter
    ///
    /// The filter is validated before any entry is looked at. Each returned
    /// entry is a consistent snapshot; the list as a whole is not. Entries
    /// come back in queue order: highest priority first, then earliest
    /// arrival.
    pub async fn list(&self, filter: &Filter) -> Result<Vec<Entry>, RegistryError> {
        filter.validate(&self.config)?;

        let candidates: Vec<SlotRef> = {
            let slots = self.slots.read().await;
            slots
                .iter()
                .filter(|(key, _)| filter.class_codes.contains(&key.class_code))
                .map(|(_, slot)| Arc::clone(slot))
                .collect()
        };

        let mut entries = Vec::with_capacity(candidates.len());
        for slot in candidates {
            let slot = slot.read().await;
            if let Some(entry) = slot.entry.as_ref().filter(|e| filter.matches(e)) {
                entries.push(entry.clone());
            }
        }

        entries.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.arrived_at.cmp(&b.arrived_at))
                .then_with(|| a.key.cmp(&b.key))
        });

        Ok(entries)
    }

    /// Get a single entry
    pub async fn get(&self, key: &EntryKey) -> Option<Entry> {
        let slot = self.find_slot(key).await?;
        let slot = slot.read().await;
        slot.entry.clone()
    }

    /// Insert a new entry with default state
    ///
    /// Fails with `Conflict` if the key already exists.
    pub async fn insert(&self, key: &EntryKey) -> Result<Entry, RegistryError> {
        key.validate(self.config.max_class_code_len)?;

        loop {
            let slot_ref = self.find_or_create_slot(key).await;
            let mut slot = slot_ref.write().await;

            // Lost a race with a delete that unlinked this slot; look again
            if slot.retired {
                continue;
            }

            if slot.entry.is_some() {
                return Err(RegistryError::Conflict(key.clone()));
            }

            let entry = Entry::new(key.clone());
            if let Err(e) = self.backend.put(&entry) {
                self.retire(key, &slot_ref, &mut slot).await;
                return Err(storage_failed("insert", key, e));
            }
            slot.entry = Some(entry.clone());

            tracing::info!(entry = %key, "Entry inserted");
            self.notify(ChangeEvent::new(key.clone(), ChangeKind::Inserted));

            return Ok(entry);
        }
    }

    /// Remove an entry
    pub async fn delete(&self, key: &EntryKey) -> Result<(), RegistryError> {
        key.validate(self.config.max_class_code_len)?;

        let slot_ref = self
            .find_slot(key)
            .await
            .ok_or_else(|| RegistryError::NotFound(key.clone()))?;
        let mut slot = slot_ref.write().await;

        if slot.entry.is_none() {
            return Err(RegistryError::NotFound(key.clone()));
        }

        self.backend
            .remove(key)
            .map_err(|e| storage_failed("delete", key, e))?;
        slot.entry = None;
        self.retire(key, &slot_ref, &mut slot).await;

        tracing::info!(entry = %key, "Entry removed");
        self.notify(ChangeEvent::new(key.clone(), ChangeKind::Removed));

        Ok(())
    }

    /// Overwrite an entry's priority
    pub async fn set_priority(&self, key: &EntryKey, priority: i32) -> Result<(), RegistryError> {
        self.update(key, "set_priority", |entry| {
            let next = entry.with_priority(priority);
            (next, ChangeKind::PriorityChanged { priority })
        })
        .await?;

        tracing::debug!(entry = %key, priority, "Priority updated");
        Ok(())
    }

    /// Flip a flag and return its new value
    pub async fn toggle_flag(&self, key: &EntryKey, flag: Flag) -> Result<bool, RegistryError> {
        let entry = self
            .update(key, "toggle_flag", |entry| {
                let next = entry.with_toggled(flag);
                let value = next.flag(flag);
                (next, ChangeKind::FlagToggled { flag, value })
            })
            .await?;

        let value = entry.flag(flag);
        tracing::debug!(entry = %key, flag = %flag, value, "Flag toggled");
        Ok(value)
    }

    /// Check if an entry exists
    pub async fn contains(&self, key: &EntryKey) -> bool {
        self.get(key).await.is_some()
    }

    /// Get total number of entries
    pub async fn entry_count(&self) -> usize {
        self.stats().await.entries
    }

    /// Get registry statistics
    pub async fn stats(&self) -> RegistryStats {
        let slots: Vec<SlotRef> = self.slots.read().await.values().cloned().collect();
        let mut stats = RegistryStats::default();

        for slot in slots {
            if let Some(entry) = &slot.read().await.entry {
                stats.entries += 1;
                if entry.is_complete {
                    stats.completed += 1;
                }
            }
        }

        stats
    }

    /// Flush the backend to durable storage
    pub fn flush(&self) -> Result<(), RegistryError> {
        self.backend.flush().inspect_err(|e| {
            tracing::error!(error = %e, "Failed to flush backend");
        })
    }

    /// Apply an in-place update to an existing entry
    ///
    /// The new state is persisted before it replaces the old one, and the
    /// change is reported while the slot is still locked.
    async fn update<F>(&self, key: &EntryKey, op: &str, f: F) -> Result<Entry, RegistryError>
    where
        F: FnOnce(&Entry) -> (Entry, ChangeKind),
    {
        key.validate(self.config.max_class_code_len)?;

        let slot_ref = self
            .find_slot(key)
            .await
            .ok_or_else(|| RegistryError::NotFound(key.clone()))?;
        let mut slot = slot_ref.write().await;

        let current = slot
            .entry
            .as_ref()
            .ok_or_else(|| RegistryError::NotFound(key.clone()))?;
        let (next, change) = f(current);

        self.backend
            .put(&next)
            .map_err(|e| storage_failed(op, key, e))?;
        slot.entry = Some(next.clone());

        self.notify(ChangeEvent::new(key.clone(), change));
        Ok(next)
    }

    async fn find_slot(&self, key: &EntryKey) -> Option<SlotRef> {
        self.slots.read().await.get(key).cloned()
    }

    async fn find_or_create_slot(&self, key: &EntryKey) -> SlotRef {
        if let Some(slot) = self.find_slot(key).await {
            return slot;
        }

        let mut slots = self.slots.write().await;
        Arc::clone(
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(RwLock::new(Slot::vacant()))),
        )
    }

    /// Unlink an empty slot from the map
    ///
    /// Called with the slot lock held. Lock order is always map then slot
    /// for lookups, and lookups never hold the map lock while waiting on a
    /// slot, so taking the map lock here cannot deadlock.
    async fn retire(&self, key: &EntryKey, slot_ref: &SlotRef, slot: &mut Slot) {
        slot.retired = true;

        let mut slots = self.slots.write().await;
        if slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot_ref)) {
            slots.remove(key);
        }
    }

    fn notify(&self, event: ChangeEvent) {
        if let Some(sink) = &self.sink {
            sink.publish(event);
        }
    }
}

impl Default for ScheduleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn storage_failed(op: &str, key: &EntryKey, err: RegistryError) -> RegistryError {
    tracing::error!(op, entry = %key, error = %err, "Backend write failed");
    err
}

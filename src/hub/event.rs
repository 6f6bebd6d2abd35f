//! Change events and the notifications fanned out to subscribers
//!
//! A [`ChangeEvent`] is produced once per committed mutation. The hub encodes
//! it exactly once into a [`Notification`]; every subscriber then receives a
//! clone that shares the same payload allocation.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::registry::{EntryKey, Flag};

/// What happened to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "change")]
pub enum ChangeKind {
    Inserted,
    Removed,
    PriorityChanged {
        priority: i32,
    },
    FlagToggled {
        flag: Flag,
        value: bool,
    },
}

/// Notification that an entry has just been mutated
///
/// Viewers re-query the registry for current state; the event only says
/// which entry changed and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(flatten)]
    pub key: EntryKey,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(key: EntryKey, kind: ChangeKind) -> Self {
        Self { key, kind }
    }

    /// Class code of the affected entry
    pub fn class_code(&self) -> &str {
        &self.key.class_code
    }
}

/// Receiver of committed changes
///
/// Implementations must not block: the registry calls this while it still
/// holds the per-entry lock so that per-entry publish order matches commit
/// order.
pub trait ChangeSink: Send + Sync {
    fn publish(&self, event: ChangeEvent);
}

/// Wire form of a notification line
#[derive(Serialize)]
#[serde(tag = "type", rename = "changed")]
struct ChangedLine<'a> {
    #[serde(flatten)]
    event: &'a ChangeEvent,
}

/// A change event ready for delivery
///
/// This is designed to be cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Class code of the affected entry
    pub class_code: String,
    /// Newline-terminated JSON line
    pub payload: Bytes,
}

impl Notification {
    /// Encode an event into its wire form
    pub fn encode(event: &ChangeEvent) -> Result<Self, serde_json::Error> {
        let mut payload = serde_json::to_vec(&ChangedLine { event })?;
        payload.push(b'\n');

        Ok(Self {
            class_code: event.key.class_code.clone(),
            payload: Bytes::from(payload),
        })
    }
}

//! Queue entry types
//!
//! This module defines the per-entry state stored in the registry.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RegistryError;
use super::key::EntryKey;

/// Independent status flags of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    /// Parent has been notified that their turn is near
    IsNotified,
    /// Parent is currently meeting the teacher
    IsMeeting,
    /// Meeting has finished
    IsComplete,
}

impl Flag {
    /// All flags, in display order
    pub const ALL: [Flag; 3] = [Flag::IsNotified, Flag::IsMeeting, Flag::IsComplete];

    /// Canonical name of the flag
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::IsNotified => "IsNotified",
            Flag::IsMeeting => "IsMeeting",
            Flag::IsComplete => "IsComplete",
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IsNotified" | "isNotified" | "is_notified" => Ok(Flag::IsNotified),
            "IsMeeting" | "isMeeting" | "is_meeting" => Ok(Flag::IsMeeting),
            "IsComplete" | "isComplete" | "is_complete" => Ok(Flag::IsComplete),
            other => Err(RegistryError::Validation(format!(
                "unknown flag: {:?}",
                other
            ))),
        }
    }
}

/// A single queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(flatten)]
    pub key: EntryKey,

    /// When the entry joined the queue
    #[serde(rename = "arrivedAt")]
    pub arrived_at: DateTime<Utc>,

    /// Queue priority, higher is served first
    pub priority: i32,

    #[serde(rename = "isNotified")]
    pub is_notified: bool,

    #[serde(rename = "isMeeting")]
    pub is_meeting: bool,

    #[serde(rename = "isComplete")]
    pub is_complete: bool,
}

impl Entry {
    /// Create a new entry with default state, arriving now
    pub fn new(key: EntryKey) -> Self {
        Self::arrived_at(key, Utc::now())
    }

    /// Create a new entry with default state and an explicit arrival time
    pub fn arrived_at(key: EntryKey, arrived_at: DateTime<Utc>) -> Self {
        Self {
            key,
            arrived_at,
            priority: 0,
            is_notified: false,
            is_meeting: false,
            is_complete: false,
        }
    }

    /// Read a flag
    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::IsNotified => self.is_notified,
            Flag::IsMeeting => self.is_meeting,
            Flag::IsComplete => self.is_complete,
        }
    }

    /// Return a copy with the flag flipped
    pub(super) fn with_toggled(&self, flag: Flag) -> Self {
        let mut next = self.clone();
        let slot = match flag {
            Flag::IsNotified => &mut next.is_notified,
            Flag::IsMeeting => &mut next.is_meeting,
            Flag::IsComplete => &mut next.is_complete,
        };
        *slot = !*slot;
        next
    }

    /// Return a copy with a new priority
    pub(super) fn with_priority(&self, priority: i32) -> Self {
        Self {
            priority,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let entry = Entry::new(EntryKey::new("1A", 5));
        assert_eq!(entry.priority, 0);
        for flag in Flag::ALL {
            assert!(!entry.flag(flag));
        }
    }

    #[test]
    fn test_toggle_touches_only_one_flag() {
        let entry = Entry::new(EntryKey::new("1A", 5));

        let toggled = entry.with_toggled(Flag::IsMeeting);
        assert!(toggled.is_meeting);
        assert!(!toggled.is_notified);
        assert!(!toggled.is_complete);
        assert_eq!(toggled.arrived_at, entry.arrived_at);

        let restored = toggled.with_toggled(Flag::IsMeeting);
        assert_eq!(restored, entry);
    }

    #[test]
    fn test_flag_names() {
        for flag in Flag::ALL {
            assert_eq!(flag.as_str().parse::<Flag>().unwrap(), flag);
        }
        assert_eq!("isComplete".parse::<Flag>().unwrap(), Flag::IsComplete);
        assert!(matches!(
            "IsDeleted".parse::<Flag>(),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_json_shape() {
        let entry = Entry::new(EntryKey::new("2B", 3));
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["classcode"], "2B");
        assert_eq!(value["classno"], 3);
        assert_eq!(value["priority"], 0);
        assert_eq!(value["isNotified"], false);
        assert_eq!(value["isMeeting"], false);
        assert_eq!(value["isComplete"], false);
        assert!(value["arrivedAt"].is_string());
    }
}

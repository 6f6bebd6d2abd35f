//! Statistics snapshots for the registry and the hub

/// Hub-wide delivery statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Change events accepted for fan-out
    pub published: u64,
    /// Notifications queued to subscribers
    pub delivered: u64,
    /// Notifications refused because a subscriber queue was full
    pub dropped: u64,
    /// Subscribers removed after their connection was found dead
    pub evicted: u64,
    /// Change events discarded because the hub inbox was full
    pub shed: u64,
}

impl HubStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of attempted deliveries that were dropped
    pub fn drop_ratio(&self) -> f64 {
        let attempted = self.delivered + self.dropped;
        if attempted > 0 {
            self.dropped as f64 / attempted as f64
        } else {
            0.0
        }
    }
}

/// Registry-wide statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of entries in the queue
    pub entries: usize,
    /// Entries marked complete but not yet removed
    pub completed: usize,
}

impl RegistryStats {
    /// Entries still waiting or in a meeting
    pub fn pending(&self) -> usize {
        self.entries.saturating_sub(self.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_stats_new() {
        let stats = HubStats::new();
        assert_eq!(stats.subscribers, 0);
        assert_eq!(stats.published, 0);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.evicted, 0);
        assert_eq!(stats.shed, 0);
    }

    #[test]
    fn test_drop_ratio() {
        let mut stats = HubStats::new();
        assert_eq!(stats.drop_ratio(), 0.0);

        stats.delivered = 3;
        stats.dropped = 1;
        assert_eq!(stats.drop_ratio(), 0.25);
    }

    #[test]
    fn test_registry_pending() {
        let stats = RegistryStats {
            entries: 5,
            completed: 2,
        };
        assert_eq!(stats.pending(), 3);
    }
}

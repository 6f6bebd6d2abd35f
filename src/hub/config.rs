//! Hub configuration

/// Default per-subscriber queue capacity
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

/// Default capacity of the coordinator's publish inbox
pub const DEFAULT_INBOX_CAPACITY: usize = 4096;

/// Configuration for the notification hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Outbound queue capacity per subscriber
    ///
    /// When a subscriber's queue is full, new notifications for that
    /// subscriber are dropped. Values below 1 are treated as 1.
    pub subscriber_capacity: usize,

    /// Change events the coordinator may have waiting for fan-out
    ///
    /// When the inbox is full, new change events are shed and counted in
    /// `HubStats::shed`. Values below 1 are treated as 1.
    pub inbox_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

impl HubConfig {
    /// Set the per-subscriber queue capacity (minimum 1)
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Set the publish inbox capacity (minimum 1)
    pub fn inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = capacity.max(1);
        self
    }
}

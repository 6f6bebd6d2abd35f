//! Runtime statistics

pub mod metrics;

pub use metrics::{HubStats, RegistryStats};

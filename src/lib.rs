//! Lineup: a concurrent queue registry with change notifications
//!
//! Entries are keyed by `(classCode, classNo)` and carry a priority, an
//! arrival time and three flags. Every committed change is announced to all
//! connected viewers through a non-blocking hub; a viewer that re-queries
//! after a notification always observes the change that triggered it.
//!
//! # Example
//!
//! ```no_run
//! use lineup::{EntryKey, Filter, Hub, LineupService, ScheduleRegistry};
//!
//! #[tokio::main]
//! async fn main() -> lineup::Result<()> {
//!     let service = LineupService::new(ScheduleRegistry::new(), Hub::spawn());
//!     let mut viewer = service.connect()?;
//!
//!     service.insert(&EntryKey::new("1A", 5)).await?;
//!
//!     if let Some(notification) = viewer.recv().await {
//!         let entries = service
//!             .list(&Filter::class_codes([notification.class_code]))
//!             .await?;
//!         println!("{} waiting", entries.len());
//!     }
//!
//!     service.disconnect(viewer).await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod hub;
pub mod registry;
pub mod server;
pub mod service;
pub mod stats;

pub use error::{Error, Result};
pub use hub::{ChangeEvent, ChangeKind, Hub, HubConfig, Notification, Subscriber, SubscriberId};
pub use registry::{
    Entry, EntryKey, ErrorKind, Filter, Flag, Predicate, RegistryConfig, RegistryError,
    ScheduleRegistry,
};
pub use server::{LineupServer, ServerConfig};
pub use service::LineupService;
pub use stats::{HubStats, RegistryStats};

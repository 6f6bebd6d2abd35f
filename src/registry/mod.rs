//! Queue entry registry
//!
//! The registry owns every queue entry, applies mutations and answers
//! filtered queries. Each key has its own lock, so writers on different
//! entries never wait on one another.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<ScheduleRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ slots: HashMap<EntryKey,     │
//!                  │   Arc<RwLock<Slot {          │
//!                  │     entry: Option<Entry>,    │
//!                  │   }>>                        │
//!                  │ >                            │
//!                  └──────┬───────────────┬───────┘
//!                         │               │
//!          lock slot ─────┘               └───── backend.put() / remove()
//!              │                                         │
//!              └──► commit in memory ◄───────────────────┘
//!                          │
//!                          └──► ChangeSink::publish()   (still under slot lock)
//! ```
//!
//! A mutation is written to the backend first; only when that succeeds is
//! the in-memory entry replaced and the change published.

pub mod backend;
pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod key;
pub mod store;

pub use backend::{EntryBackend, MemoryBackend, SledBackend};
pub use config::RegistryConfig;
pub use entry::{Entry, Flag};
pub use error::{ErrorKind, RegistryError};
pub use filter::{CompareOp, Filter, Predicate};
pub use key::{parse_priority, EntryKey};
pub use store::ScheduleRegistry;

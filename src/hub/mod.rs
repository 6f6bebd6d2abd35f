//! Change notification hub
//!
//! The hub owns the live set of subscribers and fans change events out to
//! them. All access to the set goes through one coordinator task; callers
//! only ever talk to it through a [`Hub`] handle.
//!
//! # Architecture
//!
//! ```text
//!   registry commit ──► Hub::publish() ──► bounded inbox (full => shed)
//!   Hub::stats()      ──────────────────►        │
//!   Hub::register()   ──┐                        │
//!   Subscriber::drop  ──┴─► unbounded control ───┤  control drained
//!                                                ▼  before each inbox item
//!                                      ┌───────────────────┐
//!                                      │     HubActor      │
//!                                      │ subscribers: Map< │
//!                                      │   id, mpsc::Tx >  │
//!                                      └─────────┬─────────┘
//!                                  try_send      │      (full => drop newest,
//!                       ┌────────────────────────┼──────  closed => evict)
//!                       ▼                        ▼
//!             [bounded queue]            [bounded queue]
//!             Subscriber::recv()         Subscriber::recv()
//!                       │                        │
//!                       └──► viewer connection ──┘
//! ```
//!
//! A slow viewer only ever fills its own queue. The notification payload is
//! encoded once and shared across subscribers through `bytes::Bytes`.

pub mod actor;
pub mod config;
pub mod event;
pub mod handle;
pub mod subscriber;

pub use config::HubConfig;
pub use event::{ChangeEvent, ChangeKind, ChangeSink, Notification};
pub use handle::Hub;
pub use subscriber::{Subscriber, SubscriberId};

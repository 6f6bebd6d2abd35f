//! Viewer server
//!
//! Accepts TCP connections from queue viewers. Each connection exchanges
//! newline-delimited JSON with a [`LineupService`](crate::service::LineupService)
//! and receives change notifications from the hub between replies.

pub mod config;
pub mod connection;
pub mod listener;
pub mod message;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::LineupServer;
pub use message::{Ack, Reply, Request, Scalar};

//! Command-line arguments for `lineupd`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::hub::config::DEFAULT_SUBSCRIBER_CAPACITY;
use crate::registry::{RegistryError, ScheduleRegistry, SledBackend};
use crate::server::config::{DEFAULT_MAX_LINE_LEN, DEFAULT_WRITE_TIMEOUT};
use crate::server::ServerConfig;

/// Default bind address
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Queue registry and change notification server
#[derive(Parser, Debug)]
#[command(name = "lineupd")]
#[command(version, about = "Queue registry and change notification server", long_about = None)]
pub struct Args {
    /// Address to accept viewer connections on
    #[arg(short, long, default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Path to the sled database directory
    #[arg(short, long, default_value = "./data")]
    pub data_path: PathBuf,

    /// Keep entries in memory only; nothing survives a restart
    #[arg(long)]
    pub in_memory: bool,

    /// Maximum concurrent viewers (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub max_connections: usize,

    /// Notifications buffered per viewer before new ones are dropped
    #[arg(long, default_value_t = DEFAULT_SUBSCRIBER_CAPACITY)]
    pub subscriber_capacity: usize,

    /// Longest accepted request line in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LEN)]
    pub max_line_len: usize,

    /// Seconds a viewer may leave one outbound line unread before it is dropped
    #[arg(long, default_value_t = DEFAULT_WRITE_TIMEOUT.as_secs())]
    pub write_timeout_secs: u64,
}

impl Args {
    /// Build the server configuration
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::with_addr(self.bind)
            .max_connections(self.max_connections)
            .max_line_len(self.max_line_len)
            .write_timeout(Duration::from_secs(self.write_timeout_secs.max(1)))
            .subscriber_capacity(self.subscriber_capacity)
    }

    /// Open the registry selected by the arguments
    pub fn open_registry(&self, config: &ServerConfig) -> Result<ScheduleRegistry, RegistryError> {
        if self.in_memory {
            return Ok(ScheduleRegistry::with_config(config.registry.clone()));
        }

        let backend = SledBackend::open_path(&self.data_path)?;
        ScheduleRegistry::open(backend, config.registry.clone())
    }
}

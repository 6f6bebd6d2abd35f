//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::hub::HubConfig;
use crate::registry::RegistryConfig;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Default maximum request line length (8 KiB)
pub const DEFAULT_MAX_LINE_LEN: usize = 8 * 1024;

/// Default time allowed for one outbound line to reach the socket
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent viewer connections (0 = unlimited)
    pub max_connections: usize,

    /// Longest accepted request line, excluding the newline
    pub max_line_len: usize,

    /// Close a session whose viewer has not taken one line within this time
    pub write_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Registry settings
    pub registry: RegistryConfig,

    /// Hub settings
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            max_line_len: DEFAULT_MAX_LINE_LEN,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            tcp_nodelay: true, // Notifications are small and latency sensitive
            registry: RegistryConfig::default(),
            hub: HubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set maximum request line length
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len.max(64);
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the per-subscriber notification queue capacity
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.hub = self.hub.subscriber_capacity(capacity);
        self
    }

    /// Replace the registry settings
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.max_line_len, DEFAULT_MAX_LINE_LEN);
        assert_eq!(config.write_timeout, DEFAULT_WRITE_TIMEOUT);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9090);
    }

    #[test]
    fn test_builder_max_line_len_floor() {
        let config = ServerConfig::default().max_line_len(1);

        assert_eq!(config.max_line_len, 64);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .max_line_len(4096)
            .write_timeout(Duration::from_millis(250))
            .subscriber_capacity(8)
            .registry(RegistryConfig::default().max_class_code_len(4));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.max_line_len, 4096);
        assert_eq!(config.write_timeout, Duration::from_millis(250));
        assert_eq!(config.hub.subscriber_capacity, 8);
        assert_eq!(config.registry.max_class_code_len, 4);
    }
}

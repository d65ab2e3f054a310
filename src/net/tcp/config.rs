use std::net::IpAddr;
use std::sync::Arc;

use crate::error::{NetworkError, Result};
use crate::net::addr::AddressFamily;
use crate::net::tcp::traits::{LogFacade, Logger};
use crate::net::transport::Transport;

/// Peer capacity used when none is configured.
pub const DEFAULT_MAX_PEERS: usize = 10;
/// `listen(2)` backlog used when none is configured.
pub const DEFAULT_BACKLOG: i32 = 32;

/// Configuration for a [`Server`](crate::net::tcp::Server).
///
/// Use `ServerConfig::builder()` for ergonomic construction; unset fields
/// fall back to `ServerConfig::default()`.
///
/// ## Capacity
///
/// - max_peers: number of peers the connection table holds at once. Fixed for
///   the server's lifetime; connections arriving while it is full stay pending
///   in the kernel backlog.
/// - backlog: length of the kernel queue of not-yet-accepted connections.
#[derive(Clone)]
pub struct ServerConfig {
    /// Port to listen on (0 lets the system pick one)
    pub port: u16,
    /// Address to bind to, the family's wildcard when unset
    pub bind_address: Option<IpAddr>,
    /// Address family of the listener and every peer
    pub family: AddressFamily,
    /// Socket semantics
    pub transport: Transport,
    /// Maximum number of concurrent peers (N)
    pub max_peers: usize,
    /// listen(2) backlog
    pub backlog: i32,
    /// SO_REUSEADDR on the listener
    pub reuse_address: bool,
    /// Logger for socket diagnostics
    pub logger: Arc<dyn Logger>,
}

impl ServerConfig {
    /// Create a new builder for ServerConfig
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// The address the listener binds to.
    pub fn bind_ip(&self) -> IpAddr {
        self.bind_address.unwrap_or_else(|| self.family.any_addr())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_peers == 0 {
            return Err(NetworkError::Configuration(
                "max_peers must be at least 1".into(),
            ));
        }
        if let Some(ip) = self.bind_address {
            if !self.family.accepts(ip) {
                return Err(NetworkError::Configuration(format!(
                    "bind address {} is not an {} address",
                    ip, self.family
                )));
            }
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            bind_address: None,
            family: AddressFamily::V4,
            transport: Transport::Tcp,
            max_peers: DEFAULT_MAX_PEERS,
            backlog: DEFAULT_BACKLOG,
            reuse_address: true,
            logger: Arc::new(LogFacade),
        }
    }
}

/// Builder for ServerConfig using the builder pattern.
pub struct ServerConfigBuilder {
    port: Option<u16>,
    bind_address: Option<IpAddr>,
    family: Option<AddressFamily>,
    transport: Option<Transport>,
    max_peers: Option<usize>,
    backlog: Option<i32>,
    reuse_address: Option<bool>,
    logger: Option<Arc<dyn Logger>>,
}

impl ServerConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            port: None,
            bind_address: None,
            family: None,
            transport: None,
            max_peers: None,
            backlog: None,
            reuse_address: None,
            logger: None,
        }
    }

    /// Set the port to listen on
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the address to bind to
    pub fn bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = Some(address);
        self
    }

    /// Set the address family
    pub fn family(mut self, family: AddressFamily) -> Self {
        self.family = Some(family);
        self
    }

    /// Set the transport
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the maximum number of peers
    pub fn max_peers(mut self, max: usize) -> Self {
        self.max_peers = Some(max);
        self
    }

    /// Set the listen backlog
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = Some(backlog);
        self
    }

    /// Enable or disable SO_REUSEADDR
    pub fn reuse_address(mut self, enabled: bool) -> Self {
        self.reuse_address = Some(enabled);
        self
    }

    /// Set the logger implementation
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the ServerConfig
    pub fn build(self) -> ServerConfig {
        let default = ServerConfig::default();
        ServerConfig {
            port: self.port.unwrap_or(default.port),
            bind_address: self.bind_address.or(default.bind_address),
            family: self.family.unwrap_or(default.family),
            transport: self.transport.unwrap_or(default.transport),
            max_peers: self.max_peers.unwrap_or(default.max_peers),
            backlog: self.backlog.unwrap_or(default.backlog),
            reuse_address: self.reuse_address.unwrap_or(default.reuse_address),
            logger: self.logger.unwrap_or(default.logger),
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for a [`Client`](crate::net::tcp::Client).
#[derive(Clone)]
pub struct ClientConfig {
    pub family: AddressFamily,
    pub transport: Transport,
    pub logger: Arc<dyn Logger>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            family: AddressFamily::V4,
            transport: Transport::Tcp,
            logger: Arc::new(LogFacade),
        }
    }
}

#[derive(Default)]
pub struct ClientConfigBuilder {
    family: Option<AddressFamily>,
    transport: Option<Transport>,
    logger: Option<Arc<dyn Logger>>,
}

impl ClientConfigBuilder {
    pub fn family(mut self, family: AddressFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> ClientConfig {
        let default = ClientConfig::default();
        ClientConfig {
            family: self.family.unwrap_or(default.family),
            transport: self.transport.unwrap_or(default.transport),
            logger: self.logger.unwrap_or(default.logger),
        }
    }
}

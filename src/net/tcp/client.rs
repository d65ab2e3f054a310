use std::io;
use std::net::{Shutdown, SocketAddr};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::Arc;

use socket2::{Domain, SockAddr, Socket};

use crate::error::{or_exit, NetworkError, Result};
use crate::net::io::{self as raw, Transfer};
use crate::net::resolve::resolve;
use crate::net::tcp::config::ClientConfig;
use crate::net::tcp::traits::{LogLevel, Logger};

/// A single connection to a remote endpoint.
///
/// The descriptor is non-blocking once [`Client::connect`] returns and is
/// owned by the client: it is shut down and closed exactly once, either by
/// [`Client::close`] or on drop.
pub struct Client {
    socket: Option<Socket>,
    peer: SocketAddr,
    logger: Arc<dyn Logger>,
}

impl Client {
    /// Connects over IPv4 TCP. `service` is a port number or a service name.
    pub fn connect(host: &str, service: &str) -> Result<Self> {
        Self::connect_with_config(host, service, &ClientConfig::default())
    }

    /// Resolves `(host, service)` and tries each candidate in resolver order
    /// with a fresh socket. The first successful connect wins.
    pub fn connect_with_config(host: &str, service: &str, config: &ClientConfig) -> Result<Self> {
        let candidates = resolve(host, service, config.family, config.transport).map_err(|e| {
            config.logger.log(LogLevel::Error, &e.to_string());
            e
        })?;

        let mut last_error: Option<io::Error> = None;
        for candidate in candidates {
            let socket = Socket::new(
                Domain::for_address(candidate),
                config.transport.ty(),
                config.transport.protocol(),
            )
            .map_err(NetworkError::Socket)?;

            match socket.connect(&SockAddr::from(candidate)) {
                Ok(()) => {
                    socket.set_nonblocking(true)?;
                    config.logger.log(
                        LogLevel::Info,
                        &format!("connected to {} (fd {})", candidate, socket.as_raw_fd()),
                    );
                    return Ok(Self {
                        socket: Some(socket),
                        peer: candidate,
                        logger: config.logger.clone(),
                    });
                }
                Err(e) => {
                    config
                        .logger
                        .log(LogLevel::Warn, &format!("connect to {} failed: {}", candidate, e));
                    last_error = Some(e);
                }
            }
        }

        let err = NetworkError::Connect {
            host: host.to_owned(),
            service: service.to_owned(),
            source: last_error,
        };
        config.logger.log(LogLevel::Error, &err.to_string());
        Err(err)
    }

    /// [`Client::connect`] under the fail-fast policy of [`or_exit`].
    pub fn connect_or_exit(host: &str, service: &str) -> Self {
        or_exit(Self::connect(host, service))
    }

    /// The descriptor, or `None` once closed.
    pub fn fd(&self) -> Option<RawFd> {
        self.socket.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    pub fn send(&self, buf: &[u8]) -> Transfer {
        match self.fd() {
            Some(fd) => raw::send(fd, buf),
            None => Transfer::Closed,
        }
    }

    pub fn receive(&self, buf: &mut [u8]) -> Transfer {
        match self.fd() {
            Some(fd) => raw::receive(fd, buf),
            None => Transfer::Closed,
        }
    }

    /// Shuts the connection down and closes it. Later calls do nothing.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            let fd = socket.as_raw_fd();
            let _ = socket.shutdown(Shutdown::Both);
            self.logger
                .log(LogLevel::Debug, &format!("connection closed: fd {}", fd));
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

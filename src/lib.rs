//! # Mill-Socket
//! A small connection-multiplexing socket library: one process either serves
//! many TCP peers from a single thread, or holds one client connection, over
//! IPv4 or IPv6.
//!
//! The server keeps its listener and every accepted peer in a fixed-capacity
//! table and drives them from one readiness loop built on [`mio`]. There is
//! no async runtime and no framing: bytes move through two raw primitives,
//! [`net::io::send`] and [`net::io::receive`], whose outcome is a
//! [`Transfer`].
//!
//! ## Architecture Overview
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │   Server     │───▶│   Poller     │───▶│  epoll / kqueue │
//! │  run_once()  │    └──────────────┘    └─────────────────┘
//! └──────┬───────┘
//!        │ slot index
//!        ▼
//! ┌──────────────┐    ┌──────────────┐
//! │ PeerHandler  │───▶│ send/receive │
//! └──────────────┘    └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mill_socket::prelude::*;
//!
//! fn main() -> mill_socket::error::Result<()> {
//!     let server = Server::bind(ServerConfig::builder().port(7000).max_peers(10).build())?;
//!
//!     let mut echo = |index: usize| {
//!         let mut buf = [0u8; 1024];
//!         let got = server.receive_from(index, &mut buf);
//!         if let Transfer::Bytes(n) = got {
//!             server.send_to(index, &buf[..n]);
//!         }
//!         got
//!     };
//!
//!     server.run(None, &mut echo)
//! }
//! ```
//!
//! A client is a single connected descriptor:
//!
//! ```rust,no_run
//! use mill_socket::prelude::*;
//!
//! let client = Client::connect("localhost", "7000")?;
//! client.send(b"hello");
//! # Ok::<(), mill_socket::error::NetworkError>(())
//! ```
//!
//! - [`net::tcp::Server`]: listener, connection table and the event loop
//! - [`net::tcp::Client`]: resolve-and-connect client
//! - [`handler::PeerHandler`]: what the loop calls for a readable peer
//! - [`reactor`]: `run_once`, `run` and the [`ShutdownHandle`]
//! - [`error`]: error type and the fail-fast policy

pub mod error;
pub mod handler;
pub mod net;
pub(crate) mod poll;
pub mod reactor;

pub use error::{NetworkError, Result};
pub use handler::PeerHandler;
pub use net::io::Transfer;
pub use net::tcp::{Client, Server};
pub use reactor::{LoopState, ShutdownHandle};

/// Commonly used types in one import.
///
/// ```rust
/// use mill_socket::prelude::*;
/// ```
pub mod prelude {
    pub use crate::handler::PeerHandler;
    pub use crate::net::addr::{AddressFamily, Endpoint};
    pub use crate::net::io::Transfer;
    pub use crate::net::tcp::config::{ClientConfig, ServerConfig};
    pub use crate::net::tcp::traits::{LogFacade, LogLevel, Logger, NoOpLogger};
    pub use crate::net::tcp::{AcceptOutcome, Client, PeerHandle, Server};
    pub use crate::net::transport::Transport;
    pub use crate::reactor::{LoopState, ShutdownHandle};
}

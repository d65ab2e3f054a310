//! TCP server and client built on a fixed-capacity connection table.
//!
//! A [`Server`] owns one listening socket and up to `max_peers` accepted
//! peers, all non-blocking and all registered with the same poller:
//!
//! ```text
//!   run_once(timeout, handler)
//!     │
//!     ├─ wait ──▶ ready tokens ──▶ snapshot sorted by slot index
//!     │
//!     ├─ slot 0 (listener) ──▶ accept()
//!     │        ├─ Accepted     ──▶ appended at index `count`
//!     │        ├─ LimitReached ──▶ left pending in the backlog
//!     │        └─ WouldBlock
//!     │
//!     └─ slot i (peer) ──▶ handler.on_readable(i)
//!              ├─ Bytes(n)   ──▶ re-armed
//!              ├─ WouldBlock ──▶ logged
//!              └─ Closed     ──▶ disconnect(i), last peer moves into i
//! ```
//!
//! A [`Client`] is one connected, non-blocking descriptor with the same
//! `send`/`receive` primitives.
//!
//! ## Configuration
//!
//! ```rust
//! use mill_socket::net::tcp::config::ServerConfig;
//! use mill_socket::net::tcp::traits::NoOpLogger;
//! use std::sync::Arc;
//!
//! let config = ServerConfig::builder()
//!     .port(8080)
//!     .max_peers(64)
//!     .logger(Arc::new(NoOpLogger))
//!     .build();
//! assert_eq!(config.backlog, 32);
//! ```

pub mod client;
pub mod config;
pub mod server;
pub(crate) mod table;
pub mod traits;

pub use client::Client;
pub use config::{ClientConfig, ServerConfig};
pub use server::{AcceptOutcome, PeerHandle, Server};

//! Sockets, addresses and the raw byte primitives.
//!
//! ```text
//!   addr ──────┐
//!   transport ─┼──▶ resolve ──▶ tcp::Client
//!              │
//!              └──────────────▶ tcp::Server ──▶ ConnectionTable
//!                                    │
//!   io (send / receive) ◀────────────┴──── handlers, Client
//! ```
//!
//! [`addr`] and [`transport`] are the two policies every socket is created
//! with. [`io`] holds the only two calls that move bytes; everything above
//! it reports their outcome as a [`io::Transfer`].

pub mod addr;
pub mod io;
pub mod resolve;
pub mod tcp;
pub mod transport;

pub use addr::{AddressFamily, Endpoint};
pub use io::Transfer;
pub use transport::Transport;

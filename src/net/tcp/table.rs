//! Fixed-capacity connection table.
//!
//! ```text
//!   index:   0          1          2               count-1     max_peers
//!          ┌──────────┬──────────┬──────────┬─────┬──────────┬─────┐
//!          │ listener │ peer     │ peer     │ ... │ peer     │free │
//!          └──────────┴──────────┴──────────┴─────┴──────────┴─────┘
//! ```
//!
//! Slot 0 always holds the listener. Peers are packed densely behind it and
//! removed by swap-removal, so a peer's index may change whenever another
//! peer leaves. Each slot also carries the mio token it was registered
//! with; the token stays with the peer for its whole life.

use std::net::Shutdown;
use std::os::fd::{AsRawFd, RawFd};

use mio::Token;
use socket2::Socket;

use crate::net::addr::Endpoint;

pub(crate) struct Slot {
    socket: Socket,
    endpoint: Endpoint,
    token: Token,
}

impl Slot {
    pub(crate) fn new(socket: Socket, endpoint: Endpoint, token: Token) -> Self {
        Self {
            socket,
            endpoint,
            token,
        }
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }

    pub(crate) fn socket(&self) -> &Socket {
        &self.socket
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn token(&self) -> Token {
        self.token
    }

    /// Orderly shutdown, then close when the socket drops.
    pub(crate) fn close(self) {
        let _ = self.socket.shutdown(Shutdown::Both);
    }
}

pub(crate) struct ConnectionTable {
    slots: Vec<Slot>,
    max_peers: usize,
}

impl ConnectionTable {
    pub(crate) fn new(listener: Slot, max_peers: usize) -> Self {
        let mut slots = Vec::with_capacity(max_peers + 1);
        slots.push(listener);
        Self { slots, max_peers }
    }

    /// Active slots, listener included.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn peer_count(&self) -> usize {
        self.slots.len().saturating_sub(1)
    }

    pub(crate) fn max_peers(&self) -> usize {
        self.max_peers
    }

    pub(crate) fn is_full(&self) -> bool {
        self.slots.len() >= self.max_peers + 1
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn listener(&self) -> Option<&Slot> {
        self.slots.first()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub(crate) fn position(&self, token: Token) -> Option<usize> {
        self.slots.iter().position(|slot| slot.token == token)
    }

    /// Appends a peer and returns its index, or hands the slot back when full.
    pub(crate) fn push(&mut self, slot: Slot) -> Result<usize, Slot> {
        if self.is_full() || self.slots.is_empty() {
            return Err(slot);
        }
        self.slots.push(slot);
        Ok(self.slots.len() - 1)
    }

    /// Swap-removes the peer at `index`. The listener cannot be removed.
    pub(crate) fn remove(&mut self, index: usize) -> Option<Slot> {
        if index == 0 || index >= self.slots.len() {
            return None;
        }
        Some(self.slots.swap_remove(index))
    }

    /// Closes every slot in slot order, listener first.
    pub(crate) fn close_all(&mut self) {
        for slot in self.slots.drain(..) {
            slot.close();
        }
    }
}

impl Drop for ConnectionTable {
    fn drop(&mut self) {
        self.close_all();
    }
}

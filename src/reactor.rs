use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use mio::{Token, Waker};

use crate::error::{NetworkError, Result};
use crate::handler::PeerHandler;
use crate::net::io::Transfer;
use crate::net::tcp::server::{AcceptOutcome, Server, LISTENER};
use crate::net::tcp::traits::LogLevel;
use crate::poll::Readiness;

/// Where the event loop of a server currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    Idle = 0,
    Waiting = 1,
    Dispatching = 2,
    Closed = 3,
}

impl LoopState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LoopState::Waiting,
            2 => LoopState::Dispatching,
            3 => LoopState::Closed,
            _ => LoopState::Idle,
        }
    }
}

/// Requests a running [`Server::run`] to stop.
///
/// Cloneable and usable from any thread, including a signal-handling thread:
/// `shutdown` only sets a flag and wakes the blocked wait.
#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    pub(crate) fn new(waker: Arc<Waker>) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            waker,
        }
    }

    pub fn shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            log::warn!(target: "mill_socket", "failed to wake event loop: {}", e);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl Server {
    /// Waits once for readiness and services what was ready.
    ///
    /// 1. Waits on the listener and every peer, up to `timeout` (`None` waits
    ///    indefinitely). The table lock is not held while waiting.
    /// 2. An interrupted wait returns `Ok(())` without doing anything.
    /// 3. Ready slots are serviced in slot order as seen when the wait
    ///    returned. The listener accepts one connection; a peer is handed to
    ///    `handler`, and is disconnected right away if it returns
    ///    [`Transfer::Closed`].
    /// 4. A failed accept or disconnect does not cut the round short: the
    ///    remaining slots are still serviced and the first error is returned.
    ///
    /// Peers accepted during this call are first visited by the next call.
    pub fn run_once<H>(&self, timeout: Option<Duration>, handler: &mut H) -> Result<()>
    where
        H: PeerHandler + ?Sized,
    {
        if self.state() == LoopState::Closed {
            return Err(NetworkError::Closed);
        }

        self.set_state(LoopState::Waiting);
        let waited = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .wait(timeout);

        let ready = match waited {
            Ok(ready) => ready,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                self.set_state(LoopState::Idle);
                return Ok(());
            }
            Err(e) => {
                self.set_state(LoopState::Idle);
                self.logger
                    .log(LogLevel::Error, &format!("readiness wait failed: {}", e));
                return Err(NetworkError::Poll(e));
            }
        };

        self.set_state(LoopState::Dispatching);
        let result = self.dispatch(&ready, handler);
        self.set_state(LoopState::Idle);
        result
    }

    /// Calls [`Server::run_once`] until the [`ShutdownHandle`] fires or an
    /// iteration fails.
    pub fn run<H>(&self, timeout: Option<Duration>, handler: &mut H) -> Result<()>
    where
        H: PeerHandler + ?Sized,
    {
        while !self.shutdown.is_shutdown() {
            self.run_once(timeout, handler)?;
        }
        self.logger.log(LogLevel::Info, "event loop stopped");
        Ok(())
    }

    fn dispatch<H>(&self, ready: &[Readiness], handler: &mut H) -> Result<()>
    where
        H: PeerHandler + ?Sized,
    {
        let mut snapshot: Vec<(usize, Token)> = {
            let table = self.lock_table();
            ready
                .iter()
                .filter(|r| r.wants_service())
                .filter_map(|r| table.position(r.token).map(|index| (index, r.token)))
                .collect()
        };
        snapshot.sort_unstable_by_key(|&(index, _)| index);

        // Readiness is reported once per edge: every ready slot is serviced
        // even after a failure, and the first failure is returned at the end.
        let mut first_error = None;
        for (_, token) in snapshot {
            let outcome = if token == LISTENER {
                self.accept_ready()
            } else {
                // An earlier handler in this round may have moved or removed the peer.
                match self.index_of(token) {
                    Some(index) => self.service_peer(index, token, handler),
                    None => Ok(()),
                }
            };
            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn accept_ready(&self) -> Result<()> {
        match self.accept() {
            Ok(AcceptOutcome::Accepted { fd, .. }) => {
                self.logger
                    .log(LogLevel::Debug, &format!("client connected: fd {}", fd));
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                // The pending connection is still queued; make the next wait see it.
                self.rearm_listener();
                Err(e)
            }
        }
    }

    fn service_peer<H>(&self, index: usize, token: Token, handler: &mut H) -> Result<()>
    where
        H: PeerHandler + ?Sized,
    {
        let fd = self.descriptor_at(index).unwrap_or(-1);
        match handler.on_readable(index) {
            Transfer::Closed => {
                if let Some(current) = self.index_of(token) {
                    self.disconnect(current)?;
                }
            }
            Transfer::WouldBlock => {
                self.logger
                    .log(LogLevel::Debug, &format!("no data: fd {}", fd));
            }
            Transfer::Bytes(_) => self.rearm_peer(token),
        }
        Ok(())
    }
}

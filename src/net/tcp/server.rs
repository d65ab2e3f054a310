use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mio::unix::SourceFd;
use mio::{Interest, Registry, Token};
use socket2::{SockRef, Socket};

use crate::error::{or_exit, NetworkError, Result};
use crate::net::addr::{AddressFamily, Endpoint};
use crate::net::io::{self as raw, Transfer};
use crate::net::tcp::config::ServerConfig;
use crate::net::tcp::table::{ConnectionTable, Slot};
use crate::net::tcp::traits::{LogLevel, Logger};
use crate::poll::Poller;
use crate::reactor::{LoopState, ShutdownHandle};

pub(crate) const LISTENER: Token = Token(0);

/// Result of one [`Server::accept`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// A peer was registered at `index`.
    Accepted { index: usize, fd: RawFd },
    /// The table is full; the pending connection stays in the backlog.
    LimitReached,
    /// Nothing was pending.
    WouldBlock,
}

/// Stable identity of one accepted peer.
///
/// Indices move when other peers disconnect; a handle does not. Turn it back
/// into the current index with [`Server::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerHandle {
    fd: RawFd,
    generation: u64,
}

impl PeerHandle {
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// TCP server multiplexing up to `max_peers` connections on one thread.
///
/// The connection table sits behind a mutex so the accessors can be used from
/// other threads while the event loop runs; see [`Server::run_once`].
pub struct Server {
    pub(crate) family: AddressFamily,
    pub(crate) table: Mutex<ConnectionTable>,
    pub(crate) poller: Mutex<Poller>,
    pub(crate) registry: Registry,
    pub(crate) shutdown: ShutdownHandle,
    pub(crate) state: AtomicU8,
    pub(crate) logger: Arc<dyn Logger>,
    next_token: AtomicUsize,
    listener_armed: AtomicBool,
    listener_fd: RawFd,
    local_addr: SocketAddr,
}

impl Server {
    /// Creates the listening socket, binds it and starts listening.
    ///
    /// On failure nothing is left open: a partially set up socket is closed
    /// before the error is returned.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        Self::open(&config).map_err(|e| {
            config
                .logger
                .log(LogLevel::Error, &format!("server setup failed: {}", e));
            e
        })
    }

    /// [`Server::bind`] under the fail-fast policy of [`or_exit`].
    pub fn bind_or_exit(config: ServerConfig) -> Self {
        or_exit(Self::bind(config))
    }

    fn open(config: &ServerConfig) -> Result<Self> {
        config.validate()?;
        let family = config.family;

        let socket = Socket::new(
            family.domain(),
            config.transport.ty(),
            config.transport.protocol(),
        )
        .map_err(NetworkError::Socket)?;
        if config.reuse_address {
            socket
                .set_reuse_address(true)
                .map_err(NetworkError::Socket)?;
        }
        socket.set_nonblocking(true).map_err(NetworkError::Socket)?;
        socket
            .bind(&family.socket_addr(config.port, config.bind_ip()))
            .map_err(NetworkError::Bind)?;
        socket.listen(config.backlog).map_err(NetworkError::Listen)?;

        let bound = socket.local_addr().map_err(NetworkError::Socket)?;
        let local_addr = bound.as_socket().ok_or_else(|| {
            NetworkError::Configuration("listener is not bound to an inet address".into())
        })?;

        let poller = Poller::new(config.max_peers + 2).map_err(NetworkError::Poll)?;
        let registry = poller.registry().map_err(NetworkError::Poll)?;
        let listener_fd = socket.as_raw_fd();
        registry
            .register(&mut SourceFd(&listener_fd), LISTENER, Interest::READABLE)
            .map_err(NetworkError::Poll)?;
        let shutdown = ShutdownHandle::new(poller.waker());

        let listener = Slot::new(socket, family.endpoint(&bound), LISTENER);
        config
            .logger
            .log(LogLevel::Info, &format!("listening on {}", local_addr));

        Ok(Self {
            family,
            table: Mutex::new(ConnectionTable::new(listener, config.max_peers)),
            poller: Mutex::new(poller),
            registry,
            shutdown,
            state: AtomicU8::new(LoopState::Idle as u8),
            logger: config.logger.clone(),
            next_token: AtomicUsize::new(LISTENER.0 + 1),
            listener_armed: AtomicBool::new(true),
            listener_fd,
            local_addr,
        })
    }

    pub(crate) fn lock_table(&self) -> MutexGuard<'_, ConnectionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accepts one pending connection into the table.
    ///
    /// The table lock is taken for the capacity check and the insertion only;
    /// `accept(2)` and the registration run without it.
    pub fn accept(&self) -> Result<AcceptOutcome> {
        {
            let table = self.lock_table();
            if table.listener().is_none() {
                return Err(NetworkError::Closed);
            }
            if table.is_full() {
                return Ok(self.limit_reached(table.max_peers()));
            }
        }

        // SAFETY: the listener is only closed by `close`, which takes `&mut self`,
        // so the descriptor stays open for the whole borrow.
        let listener = unsafe { BorrowedFd::borrow_raw(self.listener_fd) };
        let (socket, addr) = match SockRef::from(&listener).accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Ok(AcceptOutcome::WouldBlock);
            }
            Err(e) => {
                self.logger
                    .log(LogLevel::Error, &format!("accept failed: {}", e));
                return Err(NetworkError::Accept(e));
            }
        };
        socket.set_nonblocking(true).map_err(NetworkError::Accept)?;

        let fd = socket.as_raw_fd();
        let token = Token(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.registry
            .register(&mut SourceFd(&fd), token, Interest::READABLE)
            .map_err(NetworkError::Poll)?;

        let endpoint = self.family.endpoint(&addr);
        let pushed = self
            .lock_table()
            .push(Slot::new(socket, endpoint.clone(), token));
        let index = match pushed {
            Ok(index) => index,
            Err(slot) => {
                // Another thread filled the last slot since the check above.
                let _ = self.registry.deregister(&mut SourceFd(&fd));
                slot.close();
                return Ok(self.limit_reached(self.capacity()));
            }
        };

        self.rearm_listener();
        self.logger.log(
            LogLevel::Info,
            &format!("peer connected: fd {} from {}", fd, endpoint),
        );
        Ok(AcceptOutcome::Accepted { index, fd })
    }

    fn limit_reached(&self, max_peers: usize) -> AcceptOutcome {
        self.listener_armed.store(false, Ordering::Release);
        self.logger.log(
            LogLevel::Warn,
            &format!(
                "max peer limit reached ({} peers), connection left pending",
                max_peers
            ),
        );
        AcceptOutcome::LimitReached
    }

    /// Closes the peer at `index` and moves the last peer into its slot.
    ///
    /// Any index held across this call may now name a different peer.
    pub fn disconnect(&self, index: usize) -> Result<()> {
        let slot = self
            .lock_table()
            .remove(index)
            .ok_or(NetworkError::InvalidIndex(index))?;

        let fd = slot.fd();
        let _ = self.registry.deregister(&mut SourceFd(&fd));
        slot.close();
        self.logger
            .log(LogLevel::Info, &format!("peer disconnected: fd {}", fd));

        // Connections that arrived while the table was full produced no new
        // readiness edge; re-arm so the next wait reports them.
        if !self.listener_armed.load(Ordering::Acquire) {
            self.rearm_listener();
        }
        Ok(())
    }

    pub(crate) fn rearm_listener(&self) {
        let fd = self.listener_fd;
        match self
            .registry
            .reregister(&mut SourceFd(&fd), LISTENER, Interest::READABLE)
        {
            Ok(()) => self.listener_armed.store(true, Ordering::Release),
            Err(e) => self
                .logger
                .log(LogLevel::Debug, &format!("re-arming listener failed: {}", e)),
        }
    }

    /// Re-registers a peer so unread data is reported by the next wait.
    pub(crate) fn rearm_peer(&self, token: Token) {
        let fd = {
            let table = self.lock_table();
            match table.position(token).and_then(|i| table.get(i)) {
                Some(slot) => slot.fd(),
                None => return,
            }
        };
        if let Err(e) = self
            .registry
            .reregister(&mut SourceFd(&fd), token, Interest::READABLE)
        {
            self.logger
                .log(LogLevel::Debug, &format!("re-arming fd {} failed: {}", fd, e));
        }
    }

    pub(crate) fn index_of(&self, token: Token) -> Option<usize> {
        self.lock_table().position(token)
    }

    /// Descriptor in slot `index`; slot 0 is the listener.
    pub fn descriptor_at(&self, index: usize) -> Option<RawFd> {
        self.lock_table().get(index).map(Slot::fd)
    }

    pub fn endpoint_at(&self, index: usize) -> Result<Endpoint> {
        self.lock_table()
            .get(index)
            .map(|slot| slot.endpoint().clone())
            .ok_or(NetworkError::InvalidIndex(index))
    }

    pub fn active_peer_count(&self) -> usize {
        self.lock_table().peer_count()
    }

    /// Active slots, listener included.
    pub fn slot_count(&self) -> usize {
        self.lock_table().len()
    }

    pub fn capacity(&self) -> usize {
        self.lock_table().max_peers()
    }

    pub fn peer_handle(&self, index: usize) -> Option<PeerHandle> {
        if index == 0 {
            return None;
        }
        self.lock_table().get(index).map(|slot| PeerHandle {
            fd: slot.fd(),
            generation: slot.token().0 as u64,
        })
    }

    /// Current index of the peer behind `handle`, if it is still connected.
    pub fn resolve(&self, handle: PeerHandle) -> Option<usize> {
        self.index_of(Token(handle.generation as usize))
            .filter(|&index| index != 0)
    }

    /// Receives from the peer at `index` with [`raw::receive`].
    pub fn receive_from(&self, index: usize, buf: &mut [u8]) -> Transfer {
        match self.descriptor_at(index) {
            Some(fd) if index != 0 => raw::receive(fd, buf),
            _ => Transfer::Closed,
        }
    }

    /// Sends to the peer at `index` with [`raw::send`].
    pub fn send_to(&self, index: usize, buf: &[u8]) -> Transfer {
        match self.descriptor_at(index) {
            Some(fd) if index != 0 => raw::send(fd, buf),
            _ => Transfer::Closed,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Shuts down and closes every descriptor, listener first.
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.state() == LoopState::Closed {
            return;
        }
        self.lock_table().close_all();
        self.set_state(LoopState::Closed);
        self.logger.log(LogLevel::Info, "server closed");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
    }
}

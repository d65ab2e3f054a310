use std::io;
use std::sync::Arc;
use std::time::Duration;

use mio::{Events, Poll, Registry, Token, Waker};

/// Token reserved for the shutdown waker. Slot tokens count up from 0.
pub(crate) const WAKE_TOKEN: Token = Token(usize::MAX);

/// One ready source, as observed when the wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Readiness {
    pub token: Token,
    pub readable: bool,
    pub closed: bool,
    pub error: bool,
}

impl Readiness {
    /// Readable, hung up or failed: all mean the slot has something to look at.
    pub fn wants_service(&self) -> bool {
        self.readable || self.closed || self.error
    }
}

pub(crate) struct Poller {
    poller: Poll,
    events: Events,
    waker: Arc<Waker>,
}

impl Poller {
    pub fn new(events_capacity: usize) -> io::Result<Self> {
        let poller = Poll::new()?;
        let waker = Waker::new(poller.registry(), WAKE_TOKEN)?;
        Ok(Poller {
            poller,
            events: Events::with_capacity(events_capacity.max(1)),
            waker: Arc::new(waker),
        })
    }

    /// An owned registry, usable while another thread is blocked in [`Poller::wait`].
    pub fn registry(&self) -> io::Result<Registry> {
        self.poller.registry().try_clone()
    }

    pub fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// Blocks until a registered source is ready or `timeout` elapses and
    /// returns a snapshot of what was ready. `Interrupted` is passed through.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<Vec<Readiness>> {
        self.poller.poll(&mut self.events, timeout)?;
        Ok(self
            .events
            .iter()
            .filter(|event| event.token() != WAKE_TOKEN)
            .map(|event| Readiness {
                token: event.token(),
                readable: event.is_readable(),
                closed: event.is_read_closed(),
                error: event.is_error(),
            })
            .collect())
    }
}

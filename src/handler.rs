use crate::net::io::Transfer;

/// Application logic for a readable peer.
///
/// The event loop calls `on_readable` with the peer's current slot index. The
/// handler looks the descriptor up through the server, reads (and may reply)
/// with the raw primitives, and reports what happened:
///
/// - [`Transfer::Closed`]: the peer is gone, the loop disconnects it.
/// - [`Transfer::WouldBlock`]: nothing to read after all, the slot is left alone.
/// - [`Transfer::Bytes`]: informational only.
///
/// The descriptor must not be kept past the call; a later disconnect can move
/// another peer into the same index.
pub trait PeerHandler {
    fn on_readable(&mut self, index: usize) -> Transfer;
}

impl<F> PeerHandler for F
where
    F: FnMut(usize) -> Transfer,
{
    fn on_readable(&mut self, index: usize) -> Transfer {
        self(index)
    }
}

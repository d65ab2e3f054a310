//! Byte-level send/receive on raw descriptors.
//!
//! Each call performs exactly one `send(2)` or `recv(2)` and folds the outcome
//! into a [`Transfer`]. Nothing here blocks as long as the descriptor is in
//! non-blocking mode, which every descriptor handed out by this crate is.
//!
//! Only "would block" is told apart from failure. Every other error (reset,
//! broken pipe, ...) is reported as [`Transfer::Closed`], the same signal as
//! an orderly shutdown by the peer, so a handler has exactly one reason to
//! drop a connection.

use std::io;
use std::os::fd::RawFd;

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd"
))]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd"
)))]
const SEND_FLAGS: libc::c_int = 0;

/// Outcome of a single transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// `n > 0` bytes were moved.
    Bytes(usize),
    /// End of stream, or a transfer error.
    Closed,
    /// Nothing could be moved right now; try again after the next readiness event.
    WouldBlock,
}

impl Transfer {
    /// Integer sentinel form: `n`, `0` for closed, `-1` for would-block.
    pub fn as_raw(self) -> isize {
        match self {
            Transfer::Bytes(n) => n as isize,
            Transfer::Closed => 0,
            Transfer::WouldBlock => -1,
        }
    }

    pub fn from_raw(raw: isize) -> Self {
        match raw {
            n if n > 0 => Transfer::Bytes(n as usize),
            -1 => Transfer::WouldBlock,
            _ => Transfer::Closed,
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Transfer::Closed)
    }

    pub fn bytes(self) -> Option<usize> {
        match self {
            Transfer::Bytes(n) => Some(n),
            _ => None,
        }
    }
}

fn classify(ret: libc::ssize_t, op: &str, fd: RawFd) -> Transfer {
    if ret > 0 {
        return Transfer::Bytes(ret as usize);
    }
    if ret == 0 {
        return Transfer::Closed;
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock {
        Transfer::WouldBlock
    } else {
        log::debug!(target: "mill_socket", "{} on fd {} failed: {}", op, fd, err);
        Transfer::Closed
    }
}

/// Sends as much of `buf` as the socket takes in one call.
pub fn send(fd: RawFd, buf: &[u8]) -> Transfer {
    // SAFETY: the pointer and length describe the live `buf` slice.
    let ret = unsafe {
        libc::send(
            fd,
            buf.as_ptr() as *const libc::c_void,
            buf.len(),
            SEND_FLAGS,
        )
    };
    classify(ret, "send", fd)
}

/// Receives at most `buf.len()` bytes in one call.
pub fn receive(fd: RawFd, buf: &mut [u8]) -> Transfer {
    // SAFETY: the pointer and length describe the live, writable `buf` slice.
    let ret = unsafe { libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };
    classify(ret, "recv", fd)
}

//! Host/service resolution through `getaddrinfo(3)`.
//!
//! `std::net::ToSocketAddrs` only understands numeric ports, while a client
//! may name its service (`"http"`), so the resolver is called directly.

use std::ffi::{CStr, CString};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::{io, mem, ptr};

use crate::error::{NetworkError, Result};
use crate::net::addr::AddressFamily;
use crate::net::transport::Transport;

/// Owns a `getaddrinfo` result list and frees it on drop.
struct AddrInfoList(*mut libc::addrinfo);

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the list came from a successful getaddrinfo call and is freed once.
            unsafe { libc::freeaddrinfo(self.0) };
        }
    }
}

/// Resolves `(host, service)` into candidate addresses of `family`, in the
/// order the system resolver returns them.
pub fn resolve(
    host: &str,
    service: &str,
    family: AddressFamily,
    transport: Transport,
) -> Result<Vec<SocketAddr>> {
    let failure = |reason: String| NetworkError::Resolve {
        host: host.to_owned(),
        service: service.to_owned(),
        reason,
    };

    let c_host = CString::new(host).map_err(|_| failure("host contains a NUL byte".into()))?;
    let c_service =
        CString::new(service).map_err(|_| failure("service contains a NUL byte".into()))?;

    // SAFETY: addrinfo is a plain C struct; all-zero is the documented "no hints" value.
    let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
    hints.ai_family = family.raw();
    hints.ai_socktype = transport.raw();

    let mut res: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: both strings are NUL-terminated and outlive the call; `res` is a valid out pointer.
    let rc = unsafe { libc::getaddrinfo(c_host.as_ptr(), c_service.as_ptr(), &hints, &mut res) };
    if rc != 0 {
        let reason = if rc == libc::EAI_SYSTEM {
            io::Error::last_os_error().to_string()
        } else {
            // SAFETY: gai_strerror returns a static NUL-terminated string.
            unsafe { CStr::from_ptr(libc::gai_strerror(rc)) }
                .to_string_lossy()
                .into_owned()
        };
        return Err(failure(reason));
    }
    let list = AddrInfoList(res);

    let mut candidates = Vec::new();
    let mut cursor = list.0;
    while !cursor.is_null() {
        // SAFETY: cursor walks the list owned by `list`, which is still alive.
        let info = unsafe { &*cursor };
        // SAFETY: ai_addr/ai_addrlen come from getaddrinfo and describe one address.
        if let Some(addr) = unsafe { sockaddr_to_std(info.ai_addr, info.ai_addrlen) } {
            candidates.push(addr);
        }
        cursor = info.ai_next;
    }

    if candidates.is_empty() {
        return Err(failure("no usable address".into()));
    }
    log::trace!(target: "mill_socket", "{}:{} resolved to {:?}", host, service, candidates);
    Ok(candidates)
}

/// # Safety
///
/// `raw` must be null or point to a readable socket address of `len` bytes.
unsafe fn sockaddr_to_std(raw: *const libc::sockaddr, len: libc::socklen_t) -> Option<SocketAddr> {
    if raw.is_null() {
        return None;
    }
    match (*raw).sa_family as libc::c_int {
        libc::AF_INET if len as usize >= mem::size_of::<libc::sockaddr_in>() => {
            let v4 = *(raw as *const libc::sockaddr_in);
            let ip = Ipv4Addr::from(u32::from_be(v4.sin_addr.s_addr));
            Some(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(v4.sin_port))))
        }
        libc::AF_INET6 if len as usize >= mem::size_of::<libc::sockaddr_in6>() => {
            let v6 = *(raw as *const libc::sockaddr_in6);
            Some(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(v6.sin6_addr.s6_addr),
                u16::from_be(v6.sin6_port),
                v6.sin6_flowinfo,
                v6.sin6_scope_id,
            )))
        }
        _ => None,
    }
}

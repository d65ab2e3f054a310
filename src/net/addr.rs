//! Address family policy.
//!
//! A socket picks one [`AddressFamily`] when it is built and keeps it for its
//! whole life. The family decides the native address layout, how long a
//! textual address can get, and which address means "any interface".

use std::fmt::{self, Write as _};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, SockAddr};

/// Textual buffer size for an IPv4 address, `INET_ADDRSTRLEN`.
pub const INET_ADDRSTRLEN: usize = 16;
/// Textual buffer size for an IPv6 address, `INET6_ADDRSTRLEN`.
pub const INET6_ADDRSTRLEN: usize = 46;

/// Bounded text of a peer address, large enough for either family.
pub type AddrText = heapless::String<INET6_ADDRSTRLEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressFamily {
    #[default]
    V4,
    V6,
}

impl AddressFamily {
    pub fn domain(self) -> Domain {
        match self {
            AddressFamily::V4 => Domain::IPV4,
            AddressFamily::V6 => Domain::IPV6,
        }
    }

    /// The `AF_*` constant, as handed to the resolver.
    pub fn raw(self) -> libc::c_int {
        match self {
            AddressFamily::V4 => libc::AF_INET,
            AddressFamily::V6 => libc::AF_INET6,
        }
    }

    /// Size of the buffer needed to hold a textual address, terminator included.
    pub fn text_len(self) -> usize {
        match self {
            AddressFamily::V4 => INET_ADDRSTRLEN,
            AddressFamily::V6 => INET6_ADDRSTRLEN,
        }
    }

    pub fn any_addr(self) -> IpAddr {
        match self {
            AddressFamily::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            AddressFamily::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// Whether `ip` can be bound by a socket of this family.
    pub fn accepts(self, ip: IpAddr) -> bool {
        match (self, ip) {
            (AddressFamily::V4, IpAddr::V4(_)) => true,
            (AddressFamily::V4, IpAddr::V6(v6)) => v6.to_ipv4_mapped().is_some(),
            (AddressFamily::V6, _) => true,
        }
    }

    /// Builds the native address for `(ip, port)`.
    ///
    /// IPv4 addresses are mapped into `::ffff:0:0/96` for the V6 family and
    /// mapped IPv6 addresses are unwrapped for the V4 family. Any other
    /// mismatch is rejected earlier by [`AddressFamily::accepts`].
    pub fn socket_addr(self, port: u16, ip: IpAddr) -> SockAddr {
        let ip = match (self, ip) {
            (AddressFamily::V6, IpAddr::V4(v4)) => IpAddr::V6(v4.to_ipv6_mapped()),
            (AddressFamily::V4, IpAddr::V6(v6)) => v6
                .to_ipv4_mapped()
                .map(IpAddr::V4)
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            (_, ip) => ip,
        };
        SockAddr::from(SocketAddr::new(ip, port))
    }

    /// Extracts the textual address and port from a filled native address.
    pub fn endpoint(self, addr: &SockAddr) -> Endpoint {
        match addr.as_socket() {
            Some(sa) => Endpoint::new(sa.ip(), sa.port()),
            None => Endpoint::new(self.any_addr(), 0),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("ipv4"),
            AddressFamily::V6 => f.write_str("ipv6"),
        }
    }
}

/// Remote identity of a peer, captured when it is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: AddrText,
    port: u16,
}

impl Endpoint {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        let mut address = AddrText::new();
        // The longest IPv6 text form is 45 bytes, below the buffer size.
        let _ = write!(address, "{}", ip);
        Self { address, port }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.address.parse().ok()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} : {}]", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards() {
        assert_eq!(AddressFamily::V4.any_addr().to_string(), "0.0.0.0");
        assert_eq!(AddressFamily::V6.any_addr().to_string(), "::");
        assert_eq!(AddressFamily::V4.text_len(), 16);
        assert_eq!(AddressFamily::V6.text_len(), 46);
    }

    #[test]
    fn test_socket_addr_and_endpoint_agree() {
        let family = AddressFamily::V4;
        let native = family.socket_addr(8080, "192.168.7.2".parse().unwrap());
        assert_eq!(native.domain(), Domain::IPV4);

        let endpoint = family.endpoint(&native);
        assert_eq!(endpoint.address(), "192.168.7.2");
        assert_eq!(endpoint.port(), 8080);
        assert!(endpoint.address().len() < family.text_len());
    }

    #[test]
    fn test_v6_maps_v4_addresses() {
        let family = AddressFamily::V6;
        let native = family.socket_addr(443, "10.0.0.1".parse().unwrap());
        assert_eq!(native.domain(), Domain::IPV6);
        assert_eq!(family.endpoint(&native).address(), "::ffff:10.0.0.1");
    }

    #[test]
    fn test_accepts() {
        let v6: IpAddr = "fe80::1".parse().unwrap();
        let v4: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(AddressFamily::V4.accepts(v4));
        assert!(!AddressFamily::V4.accepts(v6));
        assert!(AddressFamily::V6.accepts(v6));
        assert!(AddressFamily::V6.accepts(v4));
    }

    #[test]
    fn test_longest_v6_text_fits() {
        let ip: IpAddr = "ffff:ffff:ffff:ffff:ffff:ffff:255.255.255.255"
            .parse()
            .unwrap();
        let endpoint = Endpoint::new(ip, 1);
        assert_eq!(endpoint.ip(), Some(ip));
        assert_eq!(endpoint.to_string(), format!("[{} : 1]", ip));
    }
}

use socket2::{Protocol, Type};

/// Socket semantics. Only stream-oriented TCP is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transport {
    #[default]
    Tcp,
}

impl Transport {
    pub fn ty(self) -> Type {
        match self {
            Transport::Tcp => Type::STREAM,
        }
    }

    pub fn protocol(self) -> Option<Protocol> {
        match self {
            Transport::Tcp => Some(Protocol::TCP),
        }
    }

    /// The `SOCK_*` constant, as handed to the resolver.
    pub fn raw(self) -> libc::c_int {
        match self {
            Transport::Tcp => libc::SOCK_STREAM,
        }
    }
}

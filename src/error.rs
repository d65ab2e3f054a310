use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Debug)]
pub enum NetworkError {
    Io(io::Error),
    Socket(io::Error),
    Bind(io::Error),
    Listen(io::Error),
    Accept(io::Error),
    Resolve {
        host: String,
        service: String,
        reason: String,
    },
    Connect {
        host: String,
        service: String,
        source: Option<io::Error>,
    },
    Poll(io::Error),
    InvalidIndex(usize),
    Configuration(String),
    Closed,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Io(e) => write!(f, "IO Error: {}", e),
            NetworkError::Socket(e) => write!(f, "Socket Error: {}", e),
            NetworkError::Bind(e) => write!(f, "Bind Error: {}", e),
            NetworkError::Listen(e) => write!(f, "Listen Error: {}", e),
            NetworkError::Accept(e) => write!(f, "Accept Error: {}", e),
            NetworkError::Resolve {
                host,
                service,
                reason,
            } => write!(f, "Resolve Error: {}:{}: {}", host, service, reason),
            NetworkError::Connect {
                host,
                service,
                source,
            } => match source {
                Some(e) => write!(f, "Connect Error: {}:{}: {}", host, service, e),
                None => write!(f, "Connect Error: {}:{}: no address to try", host, service),
            },
            NetworkError::Poll(e) => write!(f, "Poll Error: {}", e),
            NetworkError::InvalidIndex(idx) => write!(f, "Invalid slot index: {}", idx),
            NetworkError::Configuration(msg) => write!(f, "Configuration Error: {}", msg),
            NetworkError::Closed => write!(f, "Socket is closed"),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::Io(e)
            | NetworkError::Socket(e)
            | NetworkError::Bind(e)
            | NetworkError::Listen(e)
            | NetworkError::Accept(e)
            | NetworkError::Poll(e) => Some(e),
            NetworkError::Connect {
                source: Some(e), ..
            } => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NetworkError {
    fn from(err: io::Error) -> Self {
        NetworkError::Io(err)
    }
}

/// Fail-fast policy for construction errors.
///
/// A server or client that could not be created has no degraded mode, so the
/// `*_or_exit` constructors hand their result here: on error a diagnostic is
/// written to the log and to stderr, and the process exits with status 1.
/// Callers that want to retry should use the `Result`-returning constructors
/// instead.
pub fn or_exit<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            log::error!(target: "mill_socket", "fatal: {}", e);
            eprintln!("fatal: {}", e);
            std::process::exit(1);
        }
    }
}

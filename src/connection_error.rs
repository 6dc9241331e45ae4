//! Connection error types for RCON sessions
//!
//! Every failure a session can produce while connecting, authenticating or
//! exchanging a command. I/O sources are reference counted so one failed open
//! can be reported to every caller that was waiting on it.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ErrorKind;

/// Direction of a failed transport operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connecting and authenticating
    Open,
    /// Sending or awaiting a command
    Execute,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Execute => f.write_str("execute"),
        }
    }
}

/// Errors that can occur on a backend session
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ConnectionError {
    /// TCP connection failed
    TcpConnect {
        host: String,
        port: u16,
        source: Arc<io::Error>,
    },

    /// DNS resolution failed or returned no address
    DnsResolution {
        address: String,
        source: Arc<io::Error>,
    },

    /// Socket configuration failed (keepalive, nodelay)
    SocketConfig {
        operation: &'static str,
        source: Arc<io::Error>,
    },

    /// Backend rejected the credential or hung up during the handshake
    AuthenticationFailed { backend: String, reason: String },

    /// An open or a command exceeded its deadline
    Timeout {
        backend: String,
        phase: SessionPhase,
        after: Duration,
    },

    /// Writing a frame failed
    WriteFailed {
        backend: String,
        source: Arc<io::Error>,
    },

    /// Reading a frame failed or the peer closed mid-exchange
    ReadFailed {
        backend: String,
        source: Arc<io::Error>,
    },

    /// Malformed frame, mismatched request id, or invalid command text
    Protocol { backend: String, reason: String },
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TcpConnect { host, port, source } => {
                write!(f, "Failed to connect to {}:{}: {}", host, port, source)
            }
            Self::DnsResolution { address, source } => {
                write!(f, "Failed to resolve DNS for {}: {}", address, source)
            }
            Self::SocketConfig { operation, source } => {
                write!(f, "Failed to configure socket ({}): {}", operation, source)
            }
            Self::AuthenticationFailed { backend, reason } => {
                write!(
                    f,
                    "Authentication failed for backend '{}': {}",
                    backend, reason
                )
            }
            Self::Timeout {
                backend,
                phase,
                after,
            } => {
                write!(
                    f,
                    "Backend '{}' timed out during {} after {:?}",
                    backend, phase, after
                )
            }
            Self::WriteFailed { backend, source } => {
                write!(f, "Failed to write to backend '{}': {}", backend, source)
            }
            Self::ReadFailed { backend, source } => {
                write!(f, "Failed to read from backend '{}': {}", backend, source)
            }
            Self::Protocol { backend, reason } => {
                write!(f, "Protocol error on backend '{}': {}", backend, reason)
            }
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TcpConnect { source, .. }
            | Self::DnsResolution { source, .. }
            | Self::SocketConfig { source, .. }
            | Self::WriteFailed { source, .. }
            | Self::ReadFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl ConnectionError {
    pub(crate) fn write_failed(backend: &str, source: io::Error) -> Self {
        Self::WriteFailed {
            backend: backend.to_string(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn read_failed(backend: &str, source: io::Error) -> Self {
        Self::ReadFailed {
            backend: backend.to_string(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn protocol(backend: &str, reason: impl Into<String>) -> Self {
        Self::Protocol {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }

    /// Taxonomy bucket for this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::TcpConnect { .. } | Self::DnsResolution { .. } | Self::SocketConfig { .. } => {
                ErrorKind::ConnectFailed
            }
            Self::AuthenticationFailed { .. } => ErrorKind::AuthFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::WriteFailed { .. } => ErrorKind::WriteFailed,
            Self::ReadFailed { .. } => ErrorKind::ReadFailed,
            Self::Protocol { .. } => ErrorKind::ProtocolError,
        }
    }

    /// Check if this is an authentication error
    #[must_use]
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Whether a fresh session might succeed where this one failed
    ///
    /// Timeouts, transport resets and connect failures are transient.
    /// Authentication and protocol errors repeat on a new session.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::Protocol { .. }
        )
    }

    /// Get the appropriate log level for this error
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        match self {
            Self::AuthenticationFailed { .. } | Self::Protocol { .. } => tracing::Level::ERROR,
            Self::ReadFailed { source, .. } if source.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::Level::DEBUG
            }
            _ => tracing::Level::WARN,
        }
    }
}

//! Proxy-level error taxonomy
//!
//! [`ProxyError`] is what callers of the registry, pool and dispatcher see.
//! [`ErrorKind`] names the taxonomy bucket independent of the message, which
//! is what the management API reports and what retry decisions key on.

use std::time::Duration;

use thiserror::Error;

use crate::connection_error::ConnectionError;
use crate::types::{BackendName, ValidationError};

/// Taxonomy bucket of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConnectFailed,
    AuthFailed,
    Timeout,
    WriteFailed,
    ReadFailed,
    ProtocolError,
    Backpressure,
    UnknownBackend,
    DuplicateName,
    PoolExhausted,
    Cancelled,
    InvalidDescriptor,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectFailed => "ConnectFailed",
            Self::AuthFailed => "AuthFailed",
            Self::Timeout => "Timeout",
            Self::WriteFailed => "WriteFailed",
            Self::ReadFailed => "ReadFailed",
            Self::ProtocolError => "ProtocolError",
            Self::Backpressure => "Backpressure",
            Self::UnknownBackend => "UnknownBackend",
            Self::DuplicateName => "DuplicateName",
            Self::PoolExhausted => "PoolExhausted",
            Self::Cancelled => "Cancelled",
            Self::InvalidDescriptor => "InvalidDescriptor",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the proxy core
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ProxyError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("backend '{0}' is already registered")]
    DuplicateName(BackendName),

    #[error("session for backend '{backend}' still in use after {waited:?}")]
    PoolExhausted { backend: String, waited: Duration },

    #[error("queue for backend '{backend}' is full ({depth} commands waiting)")]
    Backpressure { backend: String, depth: usize },

    #[error("command for backend '{backend}' was cancelled")]
    Cancelled { backend: String },

    #[error("command for backend '{backend}' waited {waited:?} in queue")]
    QueueTimeout { backend: String, waited: Duration },

    #[error("invalid backend descriptor: {0}")]
    InvalidDescriptor(#[from] ValidationError),
}

impl ProxyError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(e) => e.kind(),
            Self::UnknownBackend(_) => ErrorKind::UnknownBackend,
            Self::DuplicateName(_) => ErrorKind::DuplicateName,
            Self::PoolExhausted { .. } => ErrorKind::PoolExhausted,
            Self::Backpressure { .. } => ErrorKind::Backpressure,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::QueueTimeout { .. } => ErrorKind::Timeout,
            Self::InvalidDescriptor(_) => ErrorKind::InvalidDescriptor,
        }
    }

    /// Whether the dispatcher may retry the command on a fresh session
    ///
    /// Only session-level transient failures qualify; queueing, registry and
    /// cancellation outcomes are final.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_transient(),
            _ => false,
        }
    }

    pub(crate) fn unknown(name: &str) -> Self {
        Self::UnknownBackend(name.to_string())
    }

    pub(crate) fn cancelled(name: &str) -> Self {
        Self::Cancelled {
            backend: name.to_string(),
        }
    }
}

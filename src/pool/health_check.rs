//! Liveness checks for idle sessions
//!
//! Run before an idle session is lent out and by the idle reaper:
//! - age check against the configured idle timeout
//! - TCP-level check using a non-blocking read
//!
//! `try_read()` on an idle RCON connection should report `WouldBlock`: the
//! server only speaks when spoken to. `Ok(0)` is EOF, `Ok(n)` is stray data
//! that would desynchronise the next exchange.

use std::io;
use std::time::Duration;

use crate::constants::pool::TCP_PEEK_BUFFER_SIZE;
use crate::session::Session;

/// Outcome of checking an idle session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleVerdict {
    Healthy,
    NotReady,
    Expired(Duration),
    PeerClosed,
    UnexpectedData,
    TransportError(io::ErrorKind),
}

impl IdleVerdict {
    #[must_use]
    #[inline]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl std::fmt::Display for IdleVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::NotReady => f.write_str("session not ready"),
            Self::Expired(idle) => write!(f, "idle for {:?}", idle),
            Self::PeerClosed => f.write_str("peer closed the connection"),
            Self::UnexpectedData => f.write_str("unexpected data on idle connection"),
            Self::TransportError(kind) => write!(f, "transport error: {}", kind),
        }
    }
}

/// Check an idle session without consuming any bytes that belong to it
#[must_use]
pub fn check_idle_session(session: &Session, idle_timeout: Duration) -> IdleVerdict {
    if !session.is_ready() {
        return IdleVerdict::NotReady;
    }

    let idle = session.idle_for();
    if idle > idle_timeout {
        return IdleVerdict::Expired(idle);
    }

    let Some(tcp) = session.tcp_stream() else {
        return IdleVerdict::NotReady;
    };

    let mut peek_buf = [0u8; TCP_PEEK_BUFFER_SIZE];
    match tcp.try_read(&mut peek_buf) {
        Ok(0) => IdleVerdict::PeerClosed,
        Ok(_) => IdleVerdict::UnexpectedData,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => IdleVerdict::Healthy,
        Err(e) => IdleVerdict::TransportError(e.kind()),
    }
}

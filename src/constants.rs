//! Constants used throughout the RCON proxy
//!
//! Centralizes protocol limits and timing defaults.

use std::time::Duration;

/// RCON wire-format limits
pub mod protocol {
    /// Bytes of a packet after the length prefix that are not body:
    /// request id (4) + type (4) + body terminator (1) + packet terminator (1)
    pub const PACKET_OVERHEAD: usize = 10;

    /// Largest command body a server accepts from a client
    pub const MAX_COMMAND_LEN: usize = 1446;

    /// Largest response body a server sends in one packet
    pub const MAX_RESPONSE_BODY: usize = 4096;

    /// Largest value accepted in the length prefix of an incoming packet
    pub const MAX_INCOMING_LEN: usize = MAX_RESPONSE_BODY + PACKET_OVERHEAD;

    /// Request id the server echoes in an authentication rejection
    pub const AUTH_REJECTED_ID: i32 = -1;

    /// Marker preceding the comma-separated player list in `list` output
    pub const PLAYER_LIST_MARKER: &str = "players online:";

    /// Command that lists online players
    pub const LIST_COMMAND: &str = "list";
}

/// Timeout defaults
pub mod timeout {
    use super::Duration;

    /// Connect plus authentication handshake
    pub const CONNECT: Duration = Duration::from_secs(5);

    /// Default per-command timeout when a backend does not set one
    pub const COMMAND: Duration = Duration::from_secs(10);

    /// How long `acquire` waits for a lent-out session
    pub const ACQUIRE: Duration = Duration::from_secs(5);

    /// How long a command may sit in a backend queue before it is abandoned
    pub const MAX_QUEUE_WAIT: Duration = Duration::from_secs(30);
}

/// Session pool defaults
pub mod pool {
    use super::Duration;

    /// Idle sessions older than this are closed rather than reused
    pub const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

    /// Interval between idle-reaper sweeps
    pub const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

    /// Size of the non-blocking peek used to detect a closed peer
    pub const TCP_PEEK_BUFFER_SIZE: usize = 1;
}

/// TCP socket tuning
pub mod socket {
    use super::Duration;

    /// Idle time before the first keepalive probe
    pub const KEEPALIVE_TIME: Duration = Duration::from_secs(60);

    /// Interval between keepalive probes
    pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
}

/// Retry policy
pub mod retry {
    /// Automatic retries allowed for a transient failure
    pub const MAX_AUTOMATIC_RETRIES: u32 = 1;

    /// Minimum jittered delay before the retry, in milliseconds
    pub const JITTER_BASE_MS: u64 = 10;

    /// Width of the jitter window, in milliseconds
    pub const JITTER_RANGE_MS: u64 = 50;
}

/// Dispatcher defaults
pub mod dispatcher {
    /// Default number of queued commands per backend
    pub const QUEUE_DEPTH: usize = 64;
}

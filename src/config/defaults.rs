//! Default values for configuration fields
//!
//! Used as serde `default = "..."` functions.

use crate::constants::{pool, retry, timeout};
use crate::types::Port;
use std::time::Duration;

#[inline]
pub fn connect_timeout() -> Duration {
    timeout::CONNECT
}

#[inline]
pub fn idle_timeout() -> Duration {
    pool::IDLE_TIMEOUT
}

#[inline]
pub fn idle_check_interval() -> Duration {
    pool::IDLE_CHECK_INTERVAL
}

#[inline]
pub fn acquire_timeout() -> Duration {
    timeout::ACQUIRE
}

#[inline]
pub fn max_queue_wait() -> Duration {
    timeout::MAX_QUEUE_WAIT
}

/// Per-command timeout for backends that do not set one
#[inline]
pub fn command_timeout() -> Duration {
    timeout::COMMAND
}

#[inline]
pub fn rcon_port() -> Port {
    Port::RCON
}

#[inline]
pub fn max_retries() -> u32 {
    retry::MAX_AUTOMATIC_RETRIES
}

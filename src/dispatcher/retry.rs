//! Failure classification and retry pacing
//!
//! A transient failure (timeout, transport error, failed connect) gets one
//! more attempt on a fresh session after a short jittered pause, so a backend
//! restart does not trigger a burst of simultaneous reconnects. Everything
//! else is surfaced as-is.

use std::time::Duration;

use crate::backend::BackendDescriptor;
use crate::constants::retry::{JITTER_BASE_MS, JITTER_RANGE_MS};
use crate::error::ProxyError;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    Retry,
    Surface,
    Cancelled,
}

pub(crate) fn classify(
    error: &ProxyError,
    descriptor: &BackendDescriptor,
    attempt: u32,
    cancelled: bool,
) -> Disposition {
    if cancelled {
        Disposition::Cancelled
    } else if error.is_transient() && attempt <= descriptor.max_retries {
        Disposition::Retry
    } else {
        Disposition::Surface
    }
}

/// 10-59ms
pub(crate) fn jitter() -> Duration {
    Duration::from_millis(JITTER_BASE_MS + rand::random::<u64>() % JITTER_RANGE_MS)
}

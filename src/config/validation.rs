//! Configuration validation
//!
//! Non-empty names, non-zero ports and non-zero queue depths are enforced by
//! the types themselves. This checks what the types cannot: uniqueness,
//! non-zero durations and the retry bound.

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::time::Duration;

use super::types::{BackendConfig, Config};
use crate::constants::retry::MAX_AUTOMATIC_RETRIES;

impl Config {
    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        non_zero("pool.connect_timeout", self.pool.connect_timeout)?;
        non_zero("pool.idle_timeout", self.pool.idle_timeout)?;
        non_zero("pool.idle_check_interval", self.pool.idle_check_interval)?;
        non_zero("pool.acquire_timeout", self.pool.acquire_timeout)?;
        non_zero("dispatcher.max_queue_wait", self.dispatcher.max_queue_wait)?;
        non_zero(
            "dispatcher.default_command_timeout",
            self.dispatcher.default_command_timeout,
        )?;

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if !seen.insert(backend.name.as_str()) {
                bail!("Backend name '{}' is configured more than once", backend.name);
            }
            validate_backend(backend)?;
        }

        if self.pool.idle_check_interval > self.pool.idle_timeout {
            tracing::warn!(
                "pool.idle_check_interval ({:?}) exceeds pool.idle_timeout ({:?}); \
                 idle sessions may outlive the timeout by up to one interval",
                self.pool.idle_check_interval,
                self.pool.idle_timeout
            );
        }

        Ok(())
    }
}

fn validate_backend(backend: &BackendConfig) -> Result<()> {
    if backend.max_retries > MAX_AUTOMATIC_RETRIES {
        bail!(
            "Backend '{}' has max_retries = {}; only 0 or 1 is supported",
            backend.name,
            backend.max_retries
        );
    }
    if let Some(timeout) = backend.timeout {
        non_zero(&format!("backends.{}.timeout", backend.name), timeout)?;
    }
    Ok(())
}

fn non_zero(field: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        bail!("{} must be greater than zero", field);
    }
    Ok(())
}

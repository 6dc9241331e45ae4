//! Configuration type definitions

use crate::backend::BackendDescriptor;
use crate::types::{
    BackendName, Credential, HostName, Port, QueueDepth, ValidationError, duration_serde,
    option_duration_serde,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults;

/// Main proxy configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Management API listener
    #[serde(default)]
    pub api: ApiConfig,
    /// Session pool timing
    #[serde(default)]
    pub pool: PoolConfig,
    /// Per-backend queueing
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Backends registered at startup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backends: Vec<BackendConfig>,
}

/// Management API listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Host/IP to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port to listen on (default: 8000)
    pub port: Port,
}

impl ApiConfig {
    /// Default listen host (all interfaces)
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Port::default(),
        }
    }
}

/// Session pool timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolConfig {
    /// Bound on connect plus authentication
    #[serde(with = "duration_serde", default = "defaults::connect_timeout")]
    pub connect_timeout: Duration,
    /// Idle sessions older than this are replaced instead of reused
    #[serde(with = "duration_serde", default = "defaults::idle_timeout")]
    pub idle_timeout: Duration,
    /// Interval between idle-reaper sweeps
    #[serde(with = "duration_serde", default = "defaults::idle_check_interval")]
    pub idle_check_interval: Duration,
    /// How long an acquire waits for a session that is lent out
    #[serde(with = "duration_serde", default = "defaults::acquire_timeout")]
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            connect_timeout: defaults::connect_timeout(),
            idle_timeout: defaults::idle_timeout(),
            idle_check_interval: defaults::idle_check_interval(),
            acquire_timeout: defaults::acquire_timeout(),
        }
    }
}

/// Command queueing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatcherConfig {
    /// Commands allowed to wait per backend before submissions are refused
    #[serde(default)]
    pub queue_depth: QueueDepth,
    /// Commands older than this when dequeued are failed without being sent
    #[serde(with = "duration_serde", default = "defaults::max_queue_wait")]
    pub max_queue_wait: Duration,
    /// Timeout for backends that do not set their own
    #[serde(with = "duration_serde", default = "defaults::command_timeout")]
    pub default_command_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_depth: QueueDepth::default(),
            max_queue_wait: defaults::max_queue_wait(),
            default_command_timeout: defaults::command_timeout(),
        }
    }
}

/// A backend listed in the config file or environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub name: BackendName,
    pub host: HostName,
    #[serde(default = "defaults::rcon_port")]
    pub port: Port,
    pub password: Credential,
    /// Per-command timeout; falls back to `dispatcher.default_command_timeout`
    #[serde(
        default,
        with = "option_duration_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BackendConfig {
    /// Build the registry descriptor for this entry
    pub fn to_descriptor(
        &self,
        default_timeout: Duration,
    ) -> Result<BackendDescriptor, ValidationError> {
        BackendDescriptor::builder(
            self.name.clone(),
            self.host.clone(),
            self.port,
            self.password.clone(),
        )
        .command_timeout(self.timeout.unwrap_or(default_timeout))
        .max_retries(self.max_retries)
        .description(self.description.clone())
        .build()
    }
}

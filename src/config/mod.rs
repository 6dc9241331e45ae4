//! Configuration module
//!
//! TOML configuration for the management API, session pool, dispatcher and
//! the backends registered at startup.

mod defaults;
mod loading;
mod types;
mod validation;

pub use loading::{ConfigSource, load_backends_from_env, load_config, load_config_with_fallback};
pub use types::{ApiConfig, BackendConfig, Config, DispatcherConfig, PoolConfig};

//! Configuration loading from files and environment variables
//!
//! Backends can be supplied through indexed environment variables for
//! container deployments; when any are present they replace the backends
//! from the config file.

use anyhow::{Context, Result};
use std::path::Path;

use super::defaults;
use super::types::{BackendConfig, Config};
use crate::types::{BackendName, Credential, HostName, Port};

/// Where the active configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Environment,
    Default,
}

impl ConfigSource {
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::File => "configuration file",
            Self::Environment => "environment variables",
            Self::Default => "built-in defaults",
        }
    }
}

/// Read backend definitions from `RCON_BACKEND_<N>_*` variables
///
/// Indices start at 0 and stop at the first missing `RCON_BACKEND_<N>_HOST`.
/// Recognised suffixes: `NAME`, `HOST`, `PORT`, `PASSWORD`, `TIMEOUT`
/// (seconds), `DESCRIPTION`.
pub fn load_backends_from_env() -> Result<Option<Vec<BackendConfig>>> {
    load_backends_with(|key| std::env::var(key).ok())
}

fn load_backends_with<F>(lookup: F) -> Result<Option<Vec<BackendConfig>>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut backends = Vec::new();

    for index in 0.. {
        let var = |suffix: &str| lookup(&format!("RCON_BACKEND_{}_{}", index, suffix));

        let Some(host) = var("HOST") else {
            break;
        };
        let host = HostName::new(host).with_context(|| format!("RCON_BACKEND_{}_HOST", index))?;

        let port = match var("PORT") {
            Some(p) => p
                .parse::<Port>()
                .with_context(|| format!("RCON_BACKEND_{}_PORT", index))?,
            None => defaults::rcon_port(),
        };

        let name = BackendName::new(var("NAME").unwrap_or_else(|| format!("server-{}", index)))
            .with_context(|| format!("RCON_BACKEND_{}_NAME", index))?;

        let timeout = var("TIMEOUT")
            .map(|t| {
                t.parse::<u64>()
                    .map(std::time::Duration::from_secs)
                    .with_context(|| format!("RCON_BACKEND_{}_TIMEOUT", index))
            })
            .transpose()?;

        backends.push(BackendConfig {
            name,
            host,
            port,
            password: Credential::new(var("PASSWORD").unwrap_or_default()),
            timeout,
            max_retries: defaults::max_retries(),
            description: var("DESCRIPTION"),
        });
    }

    Ok((!backends.is_empty()).then_some(backends))
}

/// Load configuration from a TOML file, with environment overrides
pub fn load_config(config_path: &str) -> Result<Config> {
    let config_content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file '{}'", config_path))?;

    let mut config: Config = toml::from_str(&config_content)
        .with_context(|| format!("Failed to parse config file '{}'", config_path))?;

    if let Some(env_backends) = load_backends_from_env()? {
        tracing::info!(
            "Using {} backend(s) from environment variables (overriding config file)",
            env_backends.len()
        );
        config.backends = env_backends;
    }

    config.validate()?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to environment
/// backends or defaults
pub fn load_config_with_fallback(config_path: &str) -> Result<(Config, ConfigSource)> {
    if Path::new(config_path).exists() {
        return Ok((load_config(config_path)?, ConfigSource::File));
    }

    let mut config = Config::default();
    let source = match load_backends_from_env()? {
        Some(backends) => {
            config.backends = backends;
            ConfigSource::Environment
        }
        None => ConfigSource::Default,
    };

    config.validate()?;
    tracing::info!(
        "Config file '{}' not found, using {}",
        config_path,
        source.description()
    );
    Ok((config, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_no_env_backends() {
        assert!(load_backends_with(lookup(&[])).unwrap().is_none());
    }

    #[test]
    fn test_env_backends_parsed_in_order() {
        let backends = load_backends_with(lookup(&[
            ("RCON_BACKEND_0_HOST", "mc1.local"),
            ("RCON_BACKEND_0_NAME", "survival"),
            ("RCON_BACKEND_0_PASSWORD", "pw"),
            ("RCON_BACKEND_0_TIMEOUT", "3"),
            ("RCON_BACKEND_1_HOST", "mc2.local"),
            ("RCON_BACKEND_1_PORT", "25580"),
            ("RCON_BACKEND_1_DESCRIPTION", "creative world"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(backends.len(), 2);
        assert_eq!(backends[0].name.as_str(), "survival");
        assert_eq!(backends[0].timeout, Some(Duration::from_secs(3)));
        assert_eq!(backends[0].port, Port::RCON);
        assert_eq!(backends[1].name.as_str(), "server-1");
        assert_eq!(backends[1].port.get(), 25580);
        assert_eq!(backends[1].description.as_deref(), Some("creative world"));
    }

    #[test]
    fn test_env_gap_stops_scan() {
        let backends = load_backends_with(lookup(&[
            ("RCON_BACKEND_0_HOST", "a"),
            ("RCON_BACKEND_2_HOST", "c"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(backends.len(), 1);
    }

    #[test]
    fn test_env_bad_port_is_error() {
        let err = load_backends_with(lookup(&[
            ("RCON_BACKEND_0_HOST", "a"),
            ("RCON_BACKEND_0_PORT", "99999"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("RCON_BACKEND_0_PORT"));
    }
}

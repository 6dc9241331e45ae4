//! Request and response bodies

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::BackendDescriptor;
use crate::config::DispatcherConfig;
use crate::constants::retry::MAX_AUTOMATIC_RETRIES;
use crate::types::{BackendName, Credential, HostName, Port, ValidationError};

fn default_port() -> u16 {
    Port::RCON.get()
}

/// Body of `POST /backends`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBackend {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(alias = "password")]
    pub credential: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl RegisterBackend {
    pub fn into_descriptor(
        self,
        defaults: &DispatcherConfig,
    ) -> Result<BackendDescriptor, ValidationError> {
        let timeout = self
            .command_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.default_command_timeout);

        BackendDescriptor::builder(
            BackendName::new(self.name)?,
            HostName::new(self.host)?,
            Port::try_from(self.port)?,
            Credential::new(self.credential),
        )
        .command_timeout(timeout)
        .max_retries(self.max_retries.unwrap_or(MAX_AUTOMATIC_RETRIES))
        .description(self.description)
        .build()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SayRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_defaults() {
        let body: RegisterBackend = serde_json::from_str(
            r#"{"name": "lobby", "host": "mc.local", "password": "pw"}"#,
        )
        .unwrap();
        let descriptor = body.into_descriptor(&DispatcherConfig::default()).unwrap();

        assert_eq!(descriptor.port, Port::RCON);
        assert_eq!(descriptor.max_retries, 1);
        assert_eq!(
            descriptor.command_timeout,
            DispatcherConfig::default().default_command_timeout
        );
    }

    #[test]
    fn test_register_rejects_bad_fields() {
        let defaults = DispatcherConfig::default();
        let parse = |json: &str| {
            serde_json::from_str::<RegisterBackend>(json)
                .unwrap()
                .into_descriptor(&defaults)
        };

        assert!(parse(r#"{"name": "", "host": "h", "credential": "pw"}"#).is_err());
        assert!(parse(r#"{"name": "a", "host": "h", "port": 0, "credential": "pw"}"#).is_err());
        assert!(
            parse(r#"{"name": "a", "host": "h", "credential": "pw", "maxRetries": 3}"#).is_err()
        );
        assert!(
            parse(r#"{"name": "a", "host": "h", "credential": "pw", "commandTimeoutSecs": 0}"#)
                .is_err()
        );
    }
}

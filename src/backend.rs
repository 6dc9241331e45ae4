//! Backend descriptors
//!
//! A [`BackendDescriptor`] is the immutable description of one managed game
//! server. The registry owns descriptors and hands them out as
//! `Arc<BackendDescriptor>`; replacing one means unregistering and
//! registering again.

use std::time::Duration;

use serde::Serialize;

use crate::constants::{retry::MAX_AUTOMATIC_RETRIES, timeout};
use crate::types::{BackendName, Credential, HostName, Port, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendDescriptor {
    pub name: BackendName,
    pub host: HostName,
    pub port: Port,
    #[serde(skip)]
    pub credential: Credential,
    #[serde(with = "crate::types::duration_serde", rename = "commandTimeoutSecs")]
    pub command_timeout: Duration,
    pub max_retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BackendDescriptor {
    /// Start building a descriptor with the default timeout and retry policy
    #[must_use]
    pub fn builder(
        name: BackendName,
        host: HostName,
        port: Port,
        credential: Credential,
    ) -> BackendDescriptorBuilder {
        BackendDescriptorBuilder {
            descriptor: Self {
                name,
                host,
                port,
                credential,
                command_timeout: timeout::COMMAND,
                max_retries: MAX_AUTOMATIC_RETRIES,
                description: None,
            },
        }
    }

    /// `host:port` for log lines
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Re-check invariants on a descriptor built by hand
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_retries > MAX_AUTOMATIC_RETRIES {
            return Err(ValidationError::TooManyRetries(self.max_retries));
        }
        if self.command_timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Builder for [`BackendDescriptor`]
#[derive(Debug, Clone)]
pub struct BackendDescriptorBuilder {
    descriptor: BackendDescriptor,
}

impl BackendDescriptorBuilder {
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.descriptor.command_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.descriptor.max_retries = retries;
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.descriptor.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn build(self) -> Result<BackendDescriptor, ValidationError> {
        self.descriptor.validate()?;
        Ok(self.descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> BackendDescriptorBuilder {
        BackendDescriptor::builder(
            "survival".parse().unwrap(),
            "localhost".parse().unwrap(),
            Port::RCON,
            Credential::new("pw"),
        )
    }

    #[test]
    fn test_defaults() {
        let desc = builder().build().unwrap();
        assert_eq!(desc.command_timeout, timeout::COMMAND);
        assert_eq!(desc.max_retries, 1);
        assert_eq!(desc.address(), "localhost:25575");
    }

    #[test]
    fn test_retries_above_one_rejected() {
        let err = builder().max_retries(2).build().unwrap_err();
        assert_eq!(err, ValidationError::TooManyRetries(2));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = builder()
            .command_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::ZeroTimeout);
    }

    #[test]
    fn test_blank_description_dropped() {
        let desc = builder().description(Some("  ".into())).build().unwrap();
        assert_eq!(desc.description, None);
    }

    #[test]
    fn test_serialize_hides_credential() {
        let desc = builder()
            .max_retries(0)
            .description(Some("main world".into()))
            .build()
            .unwrap();
        let json = serde_json::to_value(&desc).unwrap();
        assert!(json.get("credential").is_none());
        assert_eq!(json["maxRetries"], 0);
        assert_eq!(json["commandTimeoutSecs"], 10);
        assert_eq!(json["description"], "main world");
    }
}

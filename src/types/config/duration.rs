//! Duration serialization helpers for configuration files

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serialize a Duration as whole seconds
///
/// TOML and JSON configs specify timeouts in seconds.
pub mod duration_serde {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Helper for Option<Duration> in seconds
pub mod option_duration_serde {
    use super::*;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Timeouts {
        #[serde(with = "duration_serde")]
        command: Duration,
        #[serde(
            with = "option_duration_serde",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        idle: Option<Duration>,
    }

    #[test]
    fn test_seconds_from_toml() {
        let parsed: Timeouts = toml::from_str("command = 10\nidle = 300").unwrap();
        assert_eq!(parsed.command, Duration::from_secs(10));
        assert_eq!(parsed.idle, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_missing_optional_duration() {
        let parsed: Timeouts = toml::from_str("command = 5").unwrap();
        assert_eq!(parsed.idle, None);
    }

    #[test]
    fn test_serialize_to_seconds() {
        let value = Timeouts {
            command: Duration::from_millis(2500),
            idle: None,
        };
        let out = toml::to_string(&value).unwrap();
        assert!(out.contains("command = 2"));
    }
}

//! Validated string types that enforce invariants at construction time

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Validation errors for configuration and descriptor values
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("hostname cannot be empty or whitespace")]
    EmptyHostName,

    #[error("backend name cannot be empty or whitespace")]
    EmptyBackendName,

    #[error("invalid backend name '{0}': must not contain '/' or control characters")]
    InvalidBackendName(String),

    #[error("port cannot be 0")]
    InvalidPort,

    #[error("invalid port number: {0}")]
    InvalidPortNumber(String),

    #[error("max retries must be 0 or 1, got {0}")]
    TooManyRetries(u32),

    #[error("command timeout cannot be 0")]
    ZeroTimeout,
}

/// Macro to generate validated string newtypes.
///
/// Each type gets:
/// - A `new()` constructor that validates
/// - `as_str()` getter
/// - `AsRef<str>`, `Deref`, `Display`, `TryFrom<String>`, `FromStr` impls
/// - Serde `Serialize` and `Deserialize` with validation
macro_rules! validated_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident(String) {
            validation: |$s_param:ident| $validation:expr,
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", stringify!($name), " after validation")]
            pub fn new($s_param: String) -> Result<Self, ValidationError> {
                let validate = || $validation;
                validate()?;
                Ok(Self($s_param))
            }

            #[doc = concat!("Get the ", stringify!($name), " as a string slice")]
            #[must_use]
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from($s_param: String) -> Result<Self, Self::Error> {
                Self::new($s_param)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

validated_string! {
    /// A validated hostname that cannot be empty or whitespace-only
    ///
    /// # Examples
    /// ```
    /// use rcon_proxy::types::HostName;
    ///
    /// let host = HostName::new("mc.example.com".to_string()).unwrap();
    /// assert_eq!(host.as_str(), "mc.example.com");
    ///
    /// assert!(HostName::new("".to_string()).is_err());
    /// assert!(HostName::new("   ".to_string()).is_err());
    /// ```
    #[doc(alias = "host")]
    pub struct HostName(String) {
        validation: |s| {
            if s.trim().is_empty() {
                Err(ValidationError::EmptyHostName)
            } else {
                Ok(())
            }
        },
    }
}

validated_string! {
    /// Unique identity of a registered backend
    ///
    /// Names are used as URL path segments by the management API, so `/` and
    /// control characters are rejected.
    ///
    /// # Examples
    /// ```
    /// use rcon_proxy::types::BackendName;
    ///
    /// let name: BackendName = "survival".parse().unwrap();
    /// assert_eq!(name.as_str(), "survival");
    ///
    /// assert!("a/b".parse::<BackendName>().is_err());
    /// ```
    #[doc(alias = "server_name")]
    pub struct BackendName(String) {
        validation: |s| {
            if s.trim().is_empty() {
                Err(ValidationError::EmptyBackendName)
            } else if s.contains('/') || s.chars().any(char::is_control) {
                Err(ValidationError::InvalidBackendName(s.clone()))
            } else {
                Ok(())
            }
        },
    }
}

/// RCON password for a backend
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, for the authentication packet only
    #[must_use]
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_valid_ip() {
        let host = HostName::new("192.168.1.1".to_string()).unwrap();
        assert_eq!(host.as_str(), "192.168.1.1");
    }

    #[test]
    fn test_hostname_whitespace_rejected() {
        let result = HostName::new(" \t\n ".to_string());
        assert!(matches!(result, Err(ValidationError::EmptyHostName)));
    }

    #[test]
    fn test_hostname_serde() {
        let host = HostName::new("test.com".to_string()).unwrap();
        let json = serde_json::to_string(&host).unwrap();
        assert_eq!(json, "\"test.com\"");

        let deserialized: HostName = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, host);
    }

    #[test]
    fn test_hostname_serde_invalid() {
        let result: Result<HostName, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_name_valid() {
        let name = BackendName::new("Main Server".to_string()).unwrap();
        assert_eq!(name.as_str(), "Main Server");
        assert_eq!(name.to_string(), "Main Server");
    }

    #[test]
    fn test_backend_name_empty_rejected() {
        let result = BackendName::new("  ".to_string());
        assert!(matches!(result, Err(ValidationError::EmptyBackendName)));
    }

    #[test]
    fn test_backend_name_slash_rejected() {
        let result = BackendName::new("lobby/1".to_string());
        assert!(matches!(result, Err(ValidationError::InvalidBackendName(_))));
    }

    #[test]
    fn test_backend_name_control_char_rejected() {
        let result = BackendName::new("lobby\n".to_string());
        assert!(matches!(result, Err(ValidationError::InvalidBackendName(_))));
    }

    #[test]
    fn test_backend_name_borrow_lookup() {
        let mut map = std::collections::HashMap::new();
        map.insert(BackendName::new("a".to_string()).unwrap(), 1);
        assert_eq!(map.get("a"), Some(&1));
    }

    #[test]
    fn test_credential_redacted() {
        let cred = Credential::new("hunter2");
        assert_eq!(format!("{:?}", cred), "Credential(***)");
        assert_eq!(cred.to_string(), "***");
        assert_eq!(cred.expose(), "hunter2");
    }

    #[test]
    fn test_credential_serde_transparent() {
        let cred: Credential = serde_json::from_str("\"secret\"").unwrap();
        assert_eq!(cred.expose(), "secret");
    }
}

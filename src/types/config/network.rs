//! Network-related configuration types

use std::num::NonZeroU16;
use std::str::FromStr;

use crate::types::ValidationError;

nonzero_newtype! {
    /// A validated network port number that cannot be zero
    ///
    /// Port 0 is reserved and cannot be used for actual network communication.
    ///
    /// # Examples
    /// ```
    /// use rcon_proxy::types::Port;
    ///
    /// let port = Port::new(25575).unwrap();
    /// assert_eq!(port.get(), 25575);
    ///
    /// // Port 0 is invalid
    /// assert!(Port::new(0).is_none());
    ///
    /// assert_eq!(Port::RCON.get(), 25575);
    /// ```
    #[doc(alias = "port_number")]
    #[doc(alias = "tcp_port")]
    pub struct Port(NonZeroU16: u16, serialize as serialize_u16);
}

impl Port {
    /// Default RCON port (25575)
    pub const RCON: Self = Self(NonZeroU16::new(25575).unwrap());

    /// Default management API listen port (8000)
    pub const DEFAULT: Self = Self(NonZeroU16::new(8000).unwrap());
}

impl Default for Port {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for Port {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let port = s
            .parse::<u16>()
            .map_err(|_| ValidationError::InvalidPortNumber(s.to_string()))?;
        Self::new(port).ok_or(ValidationError::InvalidPort)
    }
}

impl TryFrom<u16> for Port {
    type Error = ValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ValidationError::InvalidPort)
    }
}

impl PartialOrd for Port {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Port {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.get().cmp(&other.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_default() {
        assert_eq!(Port::default().get(), 8000);
        assert_eq!(Port::default(), Port::DEFAULT);
    }

    #[test]
    fn test_port_rcon_constant() {
        assert_eq!(Port::RCON.get(), 25575);
    }

    #[test]
    fn test_port_new_zero_returns_none() {
        assert!(Port::new(0).is_none());
    }

    #[test]
    fn test_port_from_str_valid() {
        let port: Port = "27015".parse().unwrap();
        assert_eq!(port.get(), 27015);
    }

    #[test]
    fn test_port_from_str_zero() {
        let result: Result<Port, _> = "0".parse();
        assert!(matches!(result.unwrap_err(), ValidationError::InvalidPort));
    }

    #[test]
    fn test_port_from_str_out_of_range() {
        let result: Result<Port, _> = "65536".parse();
        assert!(matches!(
            result.unwrap_err(),
            ValidationError::InvalidPortNumber(_)
        ));
    }

    #[test]
    fn test_port_try_from() {
        assert_eq!(Port::try_from(80).unwrap().get(), 80);
        assert!(Port::try_from(0).is_err());
    }

    #[test]
    fn test_port_ord() {
        let small = Port::new(80).unwrap();
        let large = Port::new(8080).unwrap();
        assert!(small < large);
    }
}

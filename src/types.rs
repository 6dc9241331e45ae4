//! Core identifiers and validated value types

pub mod config;
pub mod validated;

pub use config::{Port, QueueDepth, ThreadCount, duration_serde, option_duration_serde};
pub use validated::{BackendName, Credential, HostName, ValidationError};

use uuid::Uuid;

/// Unique identifier for a submitted command
///
/// Appears in log lines so a command can be followed from submission through
/// queueing, execution and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(Uuid);

impl CommandId {
    /// Generate a new unique command ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

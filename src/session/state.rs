//! Session lifecycle state

use std::fmt;

/// Authentication lifecycle of a [`Session`](super::Session)
///
/// Transitions only move forward:
/// `Unauthenticated -> Authenticating -> Ready -> Closed`, and any state can
/// jump straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Ready,
    Closed,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal transition
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unauthenticated, Self::Authenticating)
                | (Self::Authenticating, Self::Ready)
                | (_, Self::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

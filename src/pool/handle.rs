//! Lease on a pooled session

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::Slot;
use crate::connection_error::ConnectionError;
use crate::session::SessionState;
use crate::types::BackendName;

/// Exclusive use of a backend's session
///
/// Give it back with [`release`](Self::release) after a clean exchange or
/// [`invalidate`](Self::invalidate) after a failure. Dropping the handle
/// without either invalidates it.
pub struct SessionHandle {
    slot: Arc<Slot>,
    session: Option<crate::session::Session>,
}

impl SessionHandle {
    pub(super) fn new(slot: Arc<Slot>, session: crate::session::Session) -> Self {
        Self {
            slot,
            session: Some(session),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &BackendName {
        &self.slot.descriptor.name
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Closed, |s| s.state())
    }

    /// Execute a command on the leased session
    pub async fn execute(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, ConnectionError> {
        match self.session.as_mut() {
            Some(session) => session.execute(command, timeout).await,
            None => Err(ConnectionError::protocol(
                self.backend(),
                "session handle already returned",
            )),
        }
    }

    /// Return the session for reuse; a session that is no longer ready is
    /// discarded instead
    pub fn release(mut self) {
        if let Some(session) = self.session.take() {
            self.slot.check_in(session);
        }
    }

    /// Discard the session; the next acquire opens a fresh one
    pub fn invalidate(mut self) {
        if let Some(session) = self.session.take() {
            self.slot.discard(session, None);
        }
    }

    /// Discard the session and record the failure that caused it
    pub fn invalidate_with(mut self, error: &ConnectionError) {
        if let Some(session) = self.session.take() {
            self.slot.discard(session, Some(error.clone()));
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(backend = %self.slot.descriptor.name, "Session handle dropped without release");
            self.slot.discard(session, None);
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("backend", self.backend())
            .field("state", &self.state())
            .finish()
    }
}

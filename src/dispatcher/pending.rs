//! Caller-side handle for a submitted command

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::time::Sleep;
use tracing::debug;

use super::queue::{CommandQueue, CommandResult};
use crate::error::ProxyError;
use crate::types::{BackendName, CommandId};

/// Resolves exactly once with the command's response or its failure
///
/// Dropping an unresolved `PendingCommand` cancels the command if it is
/// still queued. If it is already on the wire the attempt completes but is
/// not retried.
///
/// A command still queued once `max_queue_wait` has passed is taken out of
/// line and resolves `QueueTimeout`, whatever the command ahead of it is
/// doing.
#[must_use = "a dropped PendingCommand cancels its command"]
pub struct PendingCommand {
    id: CommandId,
    backend: BackendName,
    enqueued_at: Instant,
    max_queue_wait: Duration,
    queue_deadline: Option<Pin<Box<Sleep>>>,
    queue_wait_over: bool,
    receiver: oneshot::Receiver<CommandResult>,
    queue: Weak<CommandQueue>,
    cancel_requested: Arc<AtomicBool>,
    resolved: bool,
}

impl PendingCommand {
    pub(super) fn new(
        id: CommandId,
        backend: BackendName,
        enqueued_at: Instant,
        max_queue_wait: Duration,
        receiver: oneshot::Receiver<CommandResult>,
        queue: &Arc<CommandQueue>,
        cancel_requested: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            backend,
            enqueued_at,
            max_queue_wait,
            queue_deadline: None,
            queue_wait_over: false,
            receiver,
            queue: Arc::downgrade(queue),
            cancel_requested,
            resolved: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> CommandId {
        self.id
    }

    #[must_use]
    pub fn backend(&self) -> &BackendName {
        &self.backend
    }

    /// Cancel the command
    ///
    /// Returns `true` if it was still queued; it then resolves `Cancelled`.
    /// Otherwise the in-flight attempt finishes: a success is still
    /// delivered, a failure resolves `Cancelled`, and no retry is made.
    pub fn cancel(&self) -> bool {
        self.cancel_requested.store(true, Ordering::Release);
        let Some(queue) = self.queue.upgrade() else {
            return false;
        };
        match queue.remove(self.id) {
            Some(queued) => {
                debug!(backend = %self.backend, command_id = %self.id, "Cancelled queued command");
                queued.resolve(Err(ProxyError::cancelled(&self.backend)));
                true
            }
            None => false,
        }
    }
}

impl Future for PendingCommand {
    type Output = CommandResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => {
                this.resolved = true;
                return Poll::Ready(result);
            }
            Poll::Ready(Err(_)) => {
                this.resolved = true;
                return Poll::Ready(Err(ProxyError::cancelled(&this.backend)));
            }
            Poll::Pending => {}
        }

        if this.queue_wait_over {
            return Poll::Pending;
        }
        let Some(deadline) = this.enqueued_at.checked_add(this.max_queue_wait) else {
            this.queue_wait_over = true;
            return Poll::Pending;
        };
        let sleep = this
            .queue_deadline
            .get_or_insert_with(|| Box::pin(tokio::time::sleep_until(deadline.into())));
        if sleep.as_mut().poll(cx).is_pending() {
            return Poll::Pending;
        }
        this.queue_wait_over = true;

        // already popped by the worker: its result is still coming
        let Some(queued) = this.queue.upgrade().and_then(|q| q.remove(this.id)) else {
            return Poll::Pending;
        };
        drop(queued);
        let waited = this.enqueued_at.elapsed();
        debug!(backend = %this.backend, command_id = %this.id, ?waited, "Command expired in queue");
        this.resolved = true;
        Poll::Ready(Err(ProxyError::QueueTimeout {
            backend: this.backend.to_string(),
            waited,
        }))
    }
}

impl Drop for PendingCommand {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        self.cancel_requested.store(true, Ordering::Release);
        let Some(queue) = self.queue.upgrade() else {
            return;
        };
        if queue.remove(self.id).is_some() {
            debug!(backend = %self.backend, command_id = %self.id, "Dropped queued command");
        }
    }
}

impl std::fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommand")
            .field("id", &self.id)
            .field("backend", &self.backend)
            .field("resolved", &self.resolved)
            .finish()
    }
}

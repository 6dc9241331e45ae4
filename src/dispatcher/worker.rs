//! Per-backend worker loop

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, info_span, warn};

use super::queue::{CommandQueue, CommandResult, QueuedCommand};
use super::retry::{Disposition, classify, jitter};
use crate::backend::BackendDescriptor;
use crate::error::ProxyError;
use crate::pool::SessionPool;
use crate::session::SessionState;

pub(crate) struct Worker {
    pub descriptor: Arc<BackendDescriptor>,
    pub queue: Arc<CommandQueue>,
    pub pool: Arc<SessionPool>,
    pub max_queue_wait: Duration,
}

impl Worker {
    /// Drain the queue one command at a time until it is closed
    pub async fn run(self) {
        let name = self.descriptor.name.clone();
        debug!(backend = %name, "Dispatcher worker started");

        while let Some(command) = self.queue.pop().await {
            let span = info_span!("command", backend = %name, command_id = %command.id);
            self.handle(command).instrument(span).await;
        }

        debug!(backend = %name, "Dispatcher worker stopped");
    }

    async fn handle(&self, command: QueuedCommand) {
        let waited = command.enqueued_at.elapsed();
        if waited > self.max_queue_wait {
            debug!(?waited, "Command expired in queue");
            command.resolve(Err(ProxyError::QueueTimeout {
                backend: self.descriptor.name.to_string(),
                waited,
            }));
            return;
        }
        if command.reply.is_closed() || command.is_cancelled() {
            debug!("Caller gone before dispatch; skipping");
            return;
        }

        let result = self.execute_with_retry(&command).await;
        command.resolve(result);
    }

    async fn execute_with_retry(&self, command: &QueuedCommand) -> CommandResult {
        let mut attempt = 1;
        loop {
            let error = match self.attempt(&command.command, command.timeout).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            match classify(&error, &self.descriptor, attempt, command.is_cancelled()) {
                Disposition::Retry => {
                    debug!(error = %error, "Transient failure; retrying on a fresh session");
                    tokio::time::sleep(jitter()).await;
                    attempt += 1;
                }
                Disposition::Cancelled => {
                    return Err(ProxyError::cancelled(&self.descriptor.name));
                }
                Disposition::Surface => {
                    warn!(error = %error, kind = %error.kind(), "Command failed");
                    return Err(error);
                }
            }
        }
    }

    /// One acquire-execute-return cycle
    async fn attempt(&self, command: &str, timeout: Duration) -> CommandResult {
        let mut handle = self.pool.acquire(&self.descriptor.name).await?;
        match handle.execute(command, timeout).await {
            Ok(text) => {
                handle.release();
                Ok(text)
            }
            Err(e) => {
                if handle.state() == SessionState::Ready {
                    handle.release();
                } else {
                    handle.invalidate_with(&e);
                }
                Err(e.into())
            }
        }
    }
}

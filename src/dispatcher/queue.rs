//! Bounded FIFO of commands waiting for a backend

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{Notify, oneshot};

use crate::error::ProxyError;
use crate::types::CommandId;

pub(crate) type CommandResult = Result<String, ProxyError>;

/// A submitted command as the worker sees it
#[derive(Debug)]
pub(crate) struct QueuedCommand {
    pub id: CommandId,
    pub command: String,
    pub timeout: Duration,
    pub enqueued_at: Instant,
    pub cancel_requested: Arc<AtomicBool>,
    pub reply: oneshot::Sender<CommandResult>,
}

impl QueuedCommand {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Deliver the result; a caller that went away is ignored
    pub fn resolve(self, result: CommandResult) {
        let _ = self.reply.send(result);
    }
}

/// Why a push was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushError {
    Full,
    Closed,
}

struct QueueInner {
    items: VecDeque<QueuedCommand>,
    closed: bool,
}

pub(crate) struct CommandQueue {
    inner: Mutex<QueueInner>,
    ready: Notify,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            ready: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Append a command unless the queue is full or closed
    pub fn push(&self, command: QueuedCommand) -> Result<(), (QueuedCommand, PushError)> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err((command, PushError::Closed));
            }
            if inner.items.len() >= self.capacity {
                return Err((command, PushError::Full));
            }
            inner.items.push_back(command);
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Wait for the oldest command; `None` once the queue is closed
    pub async fn pop(&self) -> Option<QueuedCommand> {
        loop {
            let notified = self.ready.notified();
            {
                let mut inner = self.lock();
                if inner.closed {
                    return None;
                }
                if let Some(command) = inner.items.pop_front() {
                    return Some(command);
                }
            }
            notified.await;
        }
    }

    /// Take a still-queued command out of line
    pub fn remove(&self, id: CommandId) -> Option<QueuedCommand> {
        let mut inner = self.lock();
        let index = inner.items.iter().position(|c| c.id == id)?;
        inner.items.remove(index)
    }

    /// Refuse further pushes and hand back everything still queued
    pub fn close(&self) -> Vec<QueuedCommand> {
        let drained = {
            let mut inner = self.lock();
            inner.closed = true;
            inner.items.drain(..).collect()
        };
        self.ready.notify_one();
        drained
    }
}

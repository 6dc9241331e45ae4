//! Command dispatcher
//!
//! Each backend gets a bounded FIFO queue and a single worker task. The
//! worker is the only code that leases that backend's session, so commands
//! reach the wire strictly in submission order and never interleave. A slow
//! or dead backend only stalls its own queue.

mod pending;
mod queue;
mod retry;
mod worker;

pub use pending::PendingCommand;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::backend::BackendDescriptor;
use crate::config::DispatcherConfig;
use crate::error::ProxyError;
use crate::pool::SessionPool;
use crate::types::{BackendName, CommandId};
use queue::{CommandQueue, PushError, QueuedCommand};
use worker::Worker;

struct BackendWorker {
    descriptor: Arc<BackendDescriptor>,
    queue: Arc<CommandQueue>,
    task: JoinHandle<()>,
}

pub struct Dispatcher {
    pool: Arc<SessionPool>,
    config: DispatcherConfig,
    workers: DashMap<BackendName, BackendWorker>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backends", &self.workers.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(pool: Arc<SessionPool>, config: DispatcherConfig) -> Self {
        Self {
            pool,
            config,
            workers: DashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Create the backend's queue and spawn its worker
    pub fn add_backend(&self, descriptor: Arc<BackendDescriptor>) -> Result<(), ProxyError> {
        use dashmap::mapref::entry::Entry;

        let Entry::Vacant(entry) = self.workers.entry(descriptor.name.clone()) else {
            return Err(ProxyError::DuplicateName(descriptor.name.clone()));
        };

        let queue = Arc::new(CommandQueue::new(self.config.queue_depth.get()));
        let task = tokio::spawn(
            Worker {
                descriptor: Arc::clone(&descriptor),
                queue: Arc::clone(&queue),
                pool: Arc::clone(&self.pool),
                max_queue_wait: self.config.max_queue_wait,
            }
            .run(),
        );
        entry.insert(BackendWorker {
            descriptor,
            queue,
            task,
        });
        Ok(())
    }

    /// Queue a command for a backend
    ///
    /// Fails immediately with `Backpressure` when the queue is full; nothing
    /// is enqueued in that case. `timeout` overrides the backend's
    /// per-command timeout.
    pub fn submit(
        &self,
        name: &str,
        command: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<PendingCommand, ProxyError> {
        let (descriptor, queue) = {
            let worker = self
                .workers
                .get(name)
                .ok_or_else(|| ProxyError::unknown(name))?;
            (Arc::clone(&worker.descriptor), Arc::clone(&worker.queue))
        };

        let id = CommandId::new();
        let (reply, receiver) = oneshot::channel();
        let cancel_requested = Arc::new(AtomicBool::new(false));
        let enqueued_at = Instant::now();
        let queued = QueuedCommand {
            id,
            command: command.into(),
            timeout: timeout.unwrap_or(descriptor.command_timeout),
            enqueued_at,
            cancel_requested: Arc::clone(&cancel_requested),
            reply,
        };

        if let Err((_, reason)) = queue.push(queued) {
            return Err(match reason {
                PushError::Full => {
                    warn!(backend = %name, depth = queue.capacity(), "Queue full; rejecting command");
                    ProxyError::Backpressure {
                        backend: name.to_string(),
                        depth: queue.capacity(),
                    }
                }
                PushError::Closed => ProxyError::unknown(name),
            });
        }

        trace!(backend = %name, command_id = %id, "Command queued");
        Ok(PendingCommand::new(
            id,
            descriptor.name.clone(),
            enqueued_at,
            self.config.max_queue_wait,
            receiver,
            &queue,
            cancel_requested,
        ))
    }

    /// Commands currently waiting for a backend, excluding the one in flight
    pub fn queue_len(&self, name: &str) -> Result<usize, ProxyError> {
        self.workers
            .get(name)
            .map(|w| w.queue.len())
            .ok_or_else(|| ProxyError::unknown(name))
    }

    /// Stop a backend's worker
    ///
    /// Queued commands resolve `Cancelled`; the in-flight command, if any,
    /// finishes before this returns.
    pub async fn retire_backend(&self, name: &str) -> Result<(), ProxyError> {
        let (_, worker) = self
            .workers
            .remove(name)
            .ok_or_else(|| ProxyError::unknown(name))?;

        let cancelled = worker.queue.close();
        if !cancelled.is_empty() {
            debug!(backend = %name, count = cancelled.len(), "Cancelling queued commands");
        }
        for command in cancelled {
            command.resolve(Err(ProxyError::cancelled(name)));
        }

        if let Err(e) = worker.task.await {
            warn!(backend = %name, error = %e, "Dispatcher worker ended abnormally");
        }
        info!(backend = %name, "Dispatcher worker retired");
        Ok(())
    }

    /// Retire every backend
    pub async fn shutdown(&self) {
        let names: Vec<BackendName> = self.workers.iter().map(|e| e.key().clone()).collect();
        for name in names {
            let _ = self.retire_backend(&name).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::error::ErrorKind;
    use crate::testing::MockRcon;
    use crate::types::QueueDepth;

    fn dispatcher(queue_depth: usize) -> (Arc<SessionPool>, Dispatcher) {
        let pool = Arc::new(SessionPool::new(PoolConfig::default()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&pool),
            DispatcherConfig {
                queue_depth: QueueDepth::new(queue_depth).unwrap(),
                ..Default::default()
            },
        );
        (pool, dispatcher)
    }

    fn register(pool: &SessionPool, dispatcher: &Dispatcher, descriptor: BackendDescriptor) {
        let descriptor = Arc::new(descriptor);
        pool.add_backend(Arc::clone(&descriptor)).unwrap();
        dispatcher.add_backend(descriptor).unwrap();
    }

    #[tokio::test]
    async fn test_submit_and_await() {
        let mock = MockRcon::echo().await;
        let (pool, dispatcher) = dispatcher(8);
        register(&pool, &dispatcher, mock.descriptor("a"));

        let text = dispatcher.submit("a", "list", None).unwrap().await.unwrap();
        assert_eq!(text, "ok: list");
    }

    #[tokio::test]
    async fn test_submit_unknown_backend() {
        let (_pool, dispatcher) = dispatcher(8);
        let err = dispatcher.submit("nope", "list", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownBackend);
    }

    #[tokio::test]
    async fn test_fifo_order_on_wire() {
        let mock = MockRcon::echo().await;
        let (pool, dispatcher) = dispatcher(32);
        register(&pool, &dispatcher, mock.descriptor("a"));

        let pending: Vec<_> = (0..20)
            .map(|i| dispatcher.submit("a", format!("cmd {}", i), None).unwrap())
            .collect();
        let results = futures::future::join_all(pending).await;

        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), format!("ok: cmd {}", i));
        }
        let expected: Vec<String> = (0..20).map(|i| format!("cmd {}", i)).collect();
        assert_eq!(mock.commands().await, expected);
        assert_eq!(mock.accepted(), 1);
    }

    #[tokio::test]
    async fn test_cancel_queued_command() {
        let mock =
            MockRcon::with_reply_after(Duration::from_millis(100), |cmd| Some(cmd.to_string()))
                .await;
        let (pool, dispatcher) = dispatcher(8);
        register(&pool, &dispatcher, mock.descriptor("a"));

        let first = dispatcher.submit("a", "slow", None).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = dispatcher.submit("a", "second", None).unwrap();

        assert!(second.cancel());
        assert_eq!(second.await.unwrap_err().kind(), ErrorKind::Cancelled);
        assert_eq!(first.await.unwrap(), "slow");
        assert_eq!(mock.commands().await, vec!["slow"]);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_still_delivers_success() {
        let mock =
            MockRcon::with_reply_after(Duration::from_millis(50), |cmd| Some(cmd.to_string()))
                .await;
        let (pool, dispatcher) = dispatcher(8);
        register(&pool, &dispatcher, mock.descriptor("a"));

        let pending = dispatcher.submit("a", "list", None).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.cancel());
        assert_eq!(pending.await.unwrap(), "list");
    }

    #[tokio::test]
    async fn test_timeout_invalidates_and_retries_once() {
        let mock = MockRcon::with_reply(|cmd| (cmd != "hang").then(|| cmd.to_string())).await;
        let (pool, dispatcher) = dispatcher(8);
        register(&pool, &dispatcher, mock.descriptor("a"));

        let err = dispatcher
            .submit("a", "hang", Some(Duration::from_millis(50)))
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        // first attempt plus one retry, each on its own connection
        assert_eq!(mock.accepted(), 2);

        let text = dispatcher.submit("a", "list", None).unwrap().await.unwrap();
        assert_eq!(text, "list");
        assert_eq!(mock.accepted(), 3);
    }

    #[tokio::test]
    async fn test_no_retry_when_disabled() {
        let mock = MockRcon::with_reply(|_| None).await;
        let (pool, dispatcher) = dispatcher(8);
        let descriptor = BackendDescriptor {
            max_retries: 0,
            ..mock.descriptor("a")
        };
        register(&pool, &dispatcher, descriptor);

        let err = dispatcher
            .submit("a", "list", Some(Duration::from_millis(50)))
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(mock.accepted(), 1);
    }

    #[tokio::test]
    async fn test_backpressure_enqueues_nothing() {
        let mock =
            MockRcon::with_reply_after(Duration::from_millis(50), |cmd| Some(cmd.to_string()))
                .await;
        let (pool, dispatcher) = dispatcher(2);
        register(&pool, &dispatcher, mock.descriptor("a"));

        let in_flight = dispatcher.submit("a", "one", None).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let queued: Vec<_> = ["two", "three"]
            .iter()
            .map(|c| dispatcher.submit("a", *c, None).unwrap())
            .collect();

        let err = dispatcher.submit("a", "four", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backpressure);
        assert_eq!(dispatcher.queue_len("a").unwrap(), 2);

        in_flight.await.unwrap();
        for pending in queued {
            pending.await.unwrap();
        }
        assert_eq!(mock.commands().await, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_retire_cancels_queue_and_waits_for_in_flight() {
        let mock =
            MockRcon::with_reply_after(Duration::from_millis(80), |cmd| Some(cmd.to_string()))
                .await;
        let (pool, dispatcher) = dispatcher(8);
        register(&pool, &dispatcher, mock.descriptor("a"));

        let in_flight = dispatcher.submit("a", "one", None).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let queued = dispatcher.submit("a", "two", None).unwrap();

        dispatcher.retire_backend("a").await.unwrap();

        assert_eq!(in_flight.await.unwrap(), "one");
        assert_eq!(queued.await.unwrap_err().kind(), ErrorKind::Cancelled);
        assert!(dispatcher.submit("a", "three", None).is_err());
    }

    #[tokio::test]
    async fn test_stale_queued_command_times_out() {
        let mock =
            MockRcon::with_reply_after(Duration::from_millis(80), |cmd| Some(cmd.to_string()))
                .await;
        let pool = Arc::new(SessionPool::new(PoolConfig::default()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&pool),
            DispatcherConfig {
                max_queue_wait: Duration::from_millis(30),
                ..Default::default()
            },
        );
        register(&pool, &dispatcher, mock.descriptor("a"));

        let first = dispatcher.submit("a", "one", None).unwrap();
        let second = dispatcher.submit("a", "two", None).unwrap();

        first.await.unwrap();
        let err = second.await.unwrap_err();
        assert!(matches!(err, ProxyError::QueueTimeout { .. }));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(mock.commands().await, vec!["one"]);
    }

    #[tokio::test]
    async fn test_queue_wait_bounded_behind_slow_command() {
        let mock = MockRcon::with_reply(|cmd| (cmd != "hang").then(|| cmd.to_string())).await;
        let pool = Arc::new(SessionPool::new(PoolConfig::default()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&pool),
            DispatcherConfig {
                max_queue_wait: Duration::from_millis(50),
                ..Default::default()
            },
        );
        register(&pool, &dispatcher, mock.descriptor("a"));

        let _stuck = dispatcher
            .submit("a", "hang", Some(Duration::from_secs(2)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = Instant::now();
        let queued = dispatcher
            .submit("a", "list", Some(Duration::from_millis(100)))
            .unwrap();
        let err = tokio::time::timeout(Duration::from_secs(1), queued)
            .await
            .expect("queued command waited for the one ahead of it")
            .unwrap_err();

        assert!(matches!(err, ProxyError::QueueTimeout { .. }));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(dispatcher.queue_len("a").unwrap(), 0);
        assert_eq!(mock.commands().await, vec!["hang"]);
    }
}

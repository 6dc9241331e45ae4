//! RCON proxy facade
//!
//! [`RconProxy`] ties the [`Registry`], [`SessionPool`] and [`Dispatcher`]
//! together and is the only entry point the management API uses. Cloning is
//! cheap; every clone shares the same backends.
//!
//! ## Module structure
//!
//! - [`builder`]: construction from a [`Config`](crate::config::Config)
//! - [`status`]: probe results reported per backend

mod builder;
mod status;

pub use builder::RconProxyBuilder;
pub use status::{BackendStatus, ServerStatus};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::BackendDescriptor;
use crate::config::{Config, DispatcherConfig};
use crate::connection_error::ConnectionError;
use crate::constants::protocol::LIST_COMMAND;
use crate::dispatcher::{Dispatcher, PendingCommand};
use crate::error::ProxyError;
use crate::pool::{BackendRuntimeState, PoolStats, SessionPool};
use crate::protocol::PlayerList;
use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct RconProxy {
    pub(super) registry: Arc<Registry>,
    pub(super) pool: Arc<SessionPool>,
    pub(super) dispatcher: Arc<Dispatcher>,
    pub(super) reaper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RconProxy {
    /// Build a proxy and register the backends listed in `config`
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        RconProxyBuilder::new(config).build().await
    }

    #[must_use]
    pub fn builder(config: Config) -> RconProxyBuilder {
        RconProxyBuilder::new(config)
    }

    /// Queue settings, including the timeout applied to new backends
    #[must_use]
    pub fn dispatcher_config(&self) -> &DispatcherConfig {
        self.dispatcher.config()
    }

    /// Add a backend
    ///
    /// With `warm_up` a session is opened before returning; if that fails the
    /// backend is removed again and the open error returned. The work runs on
    /// its own task, so dropping this future does not leave a half-registered
    /// backend behind.
    pub async fn register_backend(
        &self,
        descriptor: BackendDescriptor,
        warm_up: bool,
    ) -> Result<Arc<BackendDescriptor>, ProxyError> {
        let name = descriptor.name.clone();
        let proxy = self.clone();
        run_detached(&name, async move { proxy.register_now(descriptor, warm_up).await }).await
    }

    async fn register_now(
        &self,
        descriptor: BackendDescriptor,
        warm_up: bool,
    ) -> Result<Arc<BackendDescriptor>, ProxyError> {
        let descriptor = self.registry.register(descriptor)?;
        let name = descriptor.name.clone();

        if let Err(e) = self.attach(&descriptor) {
            self.rollback(&name).await;
            return Err(e);
        }

        if warm_up {
            if let Err(e) = self.pool.warm_up(&name).await {
                warn!(backend = %name, error = %e, "Initial connect failed; backend not kept");
                self.rollback(&name).await;
                return Err(e);
            }
        }
        Ok(descriptor)
    }

    fn attach(&self, descriptor: &Arc<BackendDescriptor>) -> Result<(), ProxyError> {
        self.pool.add_backend(Arc::clone(descriptor))?;
        self.dispatcher.add_backend(Arc::clone(descriptor))
    }

    async fn rollback(&self, name: &str) {
        if let Err(e) = self.unregister_backend(name).await {
            warn!(backend = %name, error = %e, "Rollback after failed register did not complete");
        }
    }

    /// Remove a backend
    ///
    /// Queued commands resolve `Cancelled` and the in-flight one completes
    /// before the name can be registered again. The drain runs on its own
    /// task and finishes even if this future is dropped.
    pub async fn unregister_backend(&self, name: &str) -> Result<(), ProxyError> {
        let registry = Arc::clone(&self.registry);
        let dispatcher = Arc::clone(&self.dispatcher);
        let pool = Arc::clone(&self.pool);
        let owned = name.to_string();
        run_detached(name, async move {
            registry
                .unregister(&owned, |descriptor| async move {
                    let _ = dispatcher.retire_backend(&descriptor.name).await;
                    let _ = pool.remove_backend(&descriptor.name).await;
                })
                .await
        })
        .await
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<BackendDescriptor>, ProxyError> {
        self.registry.lookup(name)
    }

    #[must_use]
    pub fn list(&self) -> Vec<Arc<BackendDescriptor>> {
        self.registry.list()
    }

    /// Queue a command and return a handle to its result
    ///
    /// An unknown backend fails here without touching the pool.
    pub fn submit(
        &self,
        name: &str,
        command: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<PendingCommand, ProxyError> {
        self.registry.lookup(name)?;
        self.dispatcher.submit(name, command, timeout)
    }

    /// Submit and wait for the response text
    pub async fn execute(&self, name: &str, command: impl Into<String>) -> Result<String, ProxyError> {
        self.submit(name, command, None)?.await
    }

    pub async fn players(&self, name: &str) -> Result<PlayerList, ProxyError> {
        let response = self.execute(name, LIST_COMMAND).await?;
        Ok(PlayerList::parse(&response))
    }

    /// Broadcast a chat message
    pub async fn say(&self, name: &str, message: &str) -> Result<String, ProxyError> {
        self.execute(name, format!("say {}", message)).await
    }

    /// Probe a backend with `list`
    ///
    /// Only an unknown name is an error; probe failures are reported in the
    /// returned status.
    pub async fn status(&self, name: &str) -> Result<BackendStatus, ProxyError> {
        let descriptor = self.registry.lookup(name)?;
        let probe = self.players(name).await;
        if let Err(ProxyError::UnknownBackend(_)) = probe {
            return Err(ProxyError::unknown(name));
        }
        let session = self
            .pool
            .runtime_state(name)
            .unwrap_or(BackendRuntimeState::Offline);
        Ok(BackendStatus::probed(&descriptor, probe, session))
    }

    /// Probe every backend concurrently, ordered by name
    pub async fn statuses(&self) -> Vec<BackendStatus> {
        let names: Vec<_> = self.list().iter().map(|d| d.name.clone()).collect();
        futures::future::join_all(names.iter().map(|name| self.status(name)))
            .await
            .into_iter()
            // a backend removed mid-probe is skipped
            .filter_map(Result::ok)
            .collect()
    }

    pub fn runtime_state(&self, name: &str) -> Result<BackendRuntimeState, ProxyError> {
        self.registry.lookup(name)?;
        self.pool.runtime_state(name)
    }

    pub fn stats(&self, name: &str) -> Result<PoolStats, ProxyError> {
        self.registry.lookup(name)?;
        self.pool.stats(name)
    }

    /// Commands waiting for a backend, excluding the one in flight
    pub fn queue_len(&self, name: &str) -> Result<usize, ProxyError> {
        self.registry.lookup(name)?;
        self.dispatcher.queue_len(name)
    }

    /// Cancel queued commands, finish in-flight ones and close every session
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        self.pool.shutdown().await;
        let reaper = self
            .reaper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reaper) = reaper {
            let _ = reaper.await;
        }
        info!("RCON proxy shut down");
    }
}

/// Spawn a registry change and wait for it
async fn run_detached<T, F>(name: &str, task: F) -> Result<T, ProxyError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ProxyError>> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(result) => result,
        Err(join_error) => Err(ConnectionError::protocol(
            name,
            format!("registry task failed: {}", join_error),
        )
        .into()),
    }
}

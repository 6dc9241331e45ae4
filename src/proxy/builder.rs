//! Builder for [`RconProxy`]

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::pool::{Connector, SessionPool, TcpConnector};
use crate::registry::Registry;

use super::RconProxy;

/// Builds an [`RconProxy`] from a [`Config`]
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// use rcon_proxy::RconProxyBuilder;
/// use rcon_proxy::config::load_config;
///
/// let config = load_config("config.toml")?;
/// let proxy = RconProxyBuilder::new(config)
///     .with_prewarm(true)
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RconProxyBuilder {
    config: Config,
    connector: Option<Arc<dyn Connector>>,
    prewarm: bool,
}

impl RconProxyBuilder {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connector: None,
            prewarm: false,
        }
    }

    /// Open sessions through `connector` instead of plain TCP
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Open a session to every configured backend before returning
    ///
    /// Backends that cannot be reached stay registered and are retried on
    /// their first command.
    #[must_use]
    pub fn with_prewarm(mut self, prewarm: bool) -> Self {
        self.prewarm = prewarm;
        self
    }

    /// Must be called inside a tokio runtime; spawns the idle reaper
    pub async fn build(self) -> Result<RconProxy> {
        self.config.validate()?;

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(TcpConnector));
        let pool = Arc::new(SessionPool::with_connector(
            self.config.pool.clone(),
            connector,
        ));
        let reaper = pool.spawn_reaper();
        let dispatcher = Dispatcher::new(Arc::clone(&pool), self.config.dispatcher.clone());

        let proxy = RconProxy {
            registry: Arc::new(Registry::new()),
            pool,
            dispatcher: Arc::new(dispatcher),
            reaper: Arc::new(std::sync::Mutex::new(Some(reaper))),
        };

        let default_timeout = self.config.dispatcher.default_command_timeout;
        for backend in &self.config.backends {
            let descriptor = backend
                .to_descriptor(default_timeout)
                .with_context(|| format!("Invalid backend '{}'", backend.name))?;
            proxy
                .register_backend(descriptor, false)
                .await
                .with_context(|| format!("Failed to register backend '{}'", backend.name))?;
        }

        if self.prewarm {
            let pool = &proxy.pool;
            let results = futures::future::join_all(
                self.config
                    .backends
                    .iter()
                    .map(|b| async move { (b.name.clone(), pool.warm_up(&b.name).await) }),
            )
            .await;
            for (name, result) in results {
                if let Err(e) = result {
                    warn!(backend = %name, error = %e, "Prewarm failed; will retry on first command");
                }
            }
        }

        info!(backends = proxy.registry.len(), "RCON proxy ready");
        Ok(proxy)
    }
}

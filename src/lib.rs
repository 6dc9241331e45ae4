//! # rcon-proxy
//!
//! A control plane for fleets of game servers that speak the remote-console
//! (RCON) protocol. Management requests arrive over HTTP, are queued per
//! backend, and run one at a time over a single pooled, authenticated
//! session to each server.
//!
//! ## Layers
//!
//! - [`protocol`]: packet framing and response parsing
//! - [`session`]: one authenticated connection and its request/response cycle
//! - [`pool`]: at most one session per backend, opened lazily and recycled
//! - [`dispatcher`]: per-backend FIFO queues with timeouts and a single retry
//! - [`registry`]: the set of known backends
//! - [`proxy`]: the [`RconProxy`] facade over all of the above
//! - [`api`]: the axum management routes
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! use rcon_proxy::{BackendDescriptor, Config, RconProxy};
//!
//! let proxy = RconProxy::new(Config::default()).await?;
//! let descriptor = BackendDescriptor::builder(
//!     "survival".parse()?,
//!     "mc.example.com".parse()?,
//!     rcon_proxy::types::Port::RCON,
//!     rcon_proxy::types::Credential::new("secret"),
//! )
//! .build()?;
//! proxy.register_backend(descriptor, true).await?;
//!
//! let players = proxy.players("survival").await?;
//! println!("{} online", players.online);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod args;
pub mod backend;
pub mod config;
pub mod connection_error;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod network;
pub mod pool;
pub mod protocol;
pub mod proxy;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod types;

#[cfg(test)]
mod testing;

pub use backend::BackendDescriptor;
pub use config::{Config, ConfigSource, load_config, load_config_with_fallback};
pub use connection_error::ConnectionError;
pub use dispatcher::PendingCommand;
pub use error::{ErrorKind, ProxyError};
pub use pool::BackendRuntimeState;
pub use protocol::PlayerList;
pub use proxy::{BackendStatus, RconProxy, RconProxyBuilder, ServerStatus};

//! Tokio runtime selection and process-level helpers for the binary

use anyhow::Result;
use tracing::{error, info};

use crate::config::{Config, ConfigSource, load_config_with_fallback};
use crate::types::ThreadCount;

/// Runtime flavour chosen from `--threads`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    worker_threads: usize,
}

impl RuntimeConfig {
    /// `None` means a single-threaded runtime
    #[must_use]
    pub fn from_args(threads: Option<ThreadCount>) -> Self {
        Self {
            worker_threads: threads.unwrap_or_default().get(),
        }
    }

    #[must_use]
    pub const fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    #[must_use]
    pub const fn is_single_threaded(&self) -> bool {
        self.worker_threads == 1
    }

    /// Build a current-thread runtime for one thread, multi-thread otherwise
    pub fn build_runtime(self) -> Result<tokio::runtime::Runtime> {
        let runtime = if self.is_single_threaded() {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
        } else {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(self.worker_threads)
                .enable_all()
                .build()?
        };
        Ok(runtime)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_args(None)
    }
}

/// Resolve once Ctrl+C or (on Unix) SIGTERM arrives
///
/// A signal source that cannot be installed is logged and ignored.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// Load the configuration and log the backends it registers
pub fn load_and_log_config(config_path: &str) -> Result<(Config, ConfigSource)> {
    let (config, source) = load_config_with_fallback(config_path)?;

    info!(source = source.description(), "Loaded configuration");
    for backend in &config.backends {
        info!(
            backend = %backend.name,
            address = %format!("{}:{}", backend.host, backend.port),
            "Configured backend"
        );
    }
    Ok((config, source))
}

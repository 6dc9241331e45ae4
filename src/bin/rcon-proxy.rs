use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use rcon_proxy::RconProxy;
use rcon_proxy::api;
use rcon_proxy::args::Args;
use rcon_proxy::logging::init_logging;
use rcon_proxy::runtime::{RuntimeConfig, load_and_log_config, shutdown_signal};

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.log_file.as_deref());

    let runtime = RuntimeConfig::from_args(args.threads);
    info!(
        worker_threads = runtime.worker_threads(),
        "Starting RCON proxy"
    );
    runtime.build_runtime()?.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let config_path = args.config.to_string_lossy();
    let (config, _source) = load_and_log_config(&config_path).inspect_err(|e| {
        error!(error = %e, path = %config_path, "Failed to load configuration");
    })?;
    let listen_addr = args.listen_addr(&config.api);

    let proxy = RconProxy::builder(config)
        .with_prewarm(args.prewarm)
        .build()
        .await?;

    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", listen_addr))?;
    info!(address = %listen_addr, "Management API listening");

    axum::serve(listener, api::router(proxy.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Management API server failed")?;

    info!("Draining backends");
    proxy.shutdown().await;
    Ok(())
}

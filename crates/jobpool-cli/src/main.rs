#![doc = include_str!("../README.md")]

mod config;
mod runner;
mod telemetry;

use clap::Parser;
use config::{CliArgs, RunConfig};
use jobpool::CancellationToken;
use runner::run_pool;
use telemetry::init_telemetry;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry(config.log_format)?;
    log_startup_info(&config);

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    // Not locked: workers log to stdout concurrently.
    let mut stdout = std::io::stdout();
    run_pool(&config, cancel, &mut stdout).await?;

    Ok(())
}

fn log_startup_info(config: &RunConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Starting jobpool with full config: {:#?}", config);
    } else {
        tracing::debug!(
            "Starting jobpool with {} jobs on {} workers",
            config.job_count,
            config.pool.num_workers
        );
    }
}

/// Cancels the pool on Ctrl+C or SIGTERM. Workers finish their current job,
/// results produced so far are still printed, then the run ends.
async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, cancelling remaining jobs...");
    cancel.cancel();
}

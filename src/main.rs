//! Bounded Cache - reader/writer driver
//!
//! Builds the configured cache, runs concurrent readers and writers against it
//! and reports the resulting statistics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bounded_cache::workload::{self, Workload};
use bounded_cache::{spawn_maintenance_task, Config};

/// Main entry point for the cache driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache (fails fast on invalid configuration)
/// 4. Start background maintenance task
/// 5. Run the reader/writer workload on blocking threads
/// 6. Stop after the current round on SIGINT/SIGTERM
/// 7. Log the final statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bounded_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bounded cache driver");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_weight={}, entry_weight={}, readers={}, writers={}, keys={}, rounds={}",
        config.max_weight,
        config.entry_weight,
        config.reader_threads,
        config.writer_threads,
        config.unique_keys,
        config.rounds
    );

    let cache = Arc::new(config.build_cache().context("Failed to build cache")?);
    info!("Cache initialized: {:?}", cache);

    let maintenance = spawn_maintenance_task(cache.clone(), config.maintenance_interval());
    info!("Background maintenance task started");

    let plan = Workload::from_config(&config);
    let stop = Arc::new(AtomicBool::new(false));
    let mut driver = {
        let cache = cache.clone();
        let stop = stop.clone();
        tokio::task::spawn_blocking(move || workload::run_until(&*cache, &plan, &stop))
    };

    let finished = tokio::select! {
        finished = &mut driver => finished,
        _ = shutdown_signal() => {
            warn!("Stopping workload after the current round");
            stop.store(true, Ordering::Relaxed);
            driver.await
        }
    };
    let report = finished.context("Workload thread failed")?;
    info!("Workload complete: {}", serde_json::to_string(&report)?);

    maintenance.abort();
    info!("Maintenance task stopped");

    let stats = cache.stats();
    info!(
        "Final statistics (hit rate {:.2}%): {}",
        stats.hit_rate() * 100.0,
        serde_json::to_string(&stats)?
    );

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

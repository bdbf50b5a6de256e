// Dispatcher binary entry point

use anyhow::bail;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadenced::clock::{Clock, SystemClock};
use cadenced::config::{build_registry, Settings};
use cadenced::dispatch::{Dispatcher, HttpDispatcher};
use cadenced::loops::{spawn_all, LoopConfig};
use cadenced::resolver::resolve_zone;

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("cadenced={}", default_level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.observability.log_level);

    info!("Starting cadenced dispatcher");

    if let Err(reason) = settings.validate() {
        bail!("Invalid configuration: {reason}");
    }

    let tz = resolve_zone(&settings.server.zone);
    info!(zone = %tz, base_url = %settings.server.base_url, "Configuration loaded");

    // Unrecoverable configuration errors fail fast before any task spawns
    let registry = build_registry(&settings.jobs);
    if registry.is_empty() {
        bail!("No job has a valid schedule; refusing to start");
    }

    // Single shared client, passed by reference to every loop
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(HttpDispatcher::new(
        &settings.server.base_url,
        Duration::from_secs(settings.dispatch.timeout_seconds),
    )?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let loop_config = LoopConfig {
        retry_backoff: Duration::from_secs(settings.dispatch.retry_backoff_seconds),
        retry_non_success: settings.dispatch.retry_non_success,
    };

    let handles = spawn_all(&registry, tz, clock, dispatcher, &loop_config);
    info!(loops = handles.len(), "All dispatch loops started");

    // Run until interrupted; outstanding HTTP calls are abandoned
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");
    for handle in handles {
        handle.abort();
    }

    Ok(())
}

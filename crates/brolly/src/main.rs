//! Brolly server binary.
//!
//! Reads provider credentials from the environment, wires the live
//! upstream clients and the in-memory cache into the aggregator, and
//! serves the HTTP API plus the embedded browser shell.

use argh::FromArgs;
use brolly::aggregator::WeatherAggregator;
use brolly::cache::MemoryCache;
use brolly::config::EdgeConfig;
use brolly::http_server::{run_http_server, AppState};
use brolly::upstream::LiveUpstreams;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(FromArgs)]
/// Brolly - edge-localized weather assistant
struct Args {
    /// HTTP listen port (default: 8787)
    #[argh(option, short = 'p', default = "8787")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();

    log::info!("Starting brolly...");

    let config = EdgeConfig::from_env();
    if config.amap_key.is_none() {
        log::warn!("AMAP_API_KEY not set; IP geolocation will degrade");
    }
    if config.qweather_key.is_none() {
        log::warn!("QWEATHER_API_KEY not set; weather lookups will degrade");
    }
    if config.completion_key.is_none() {
        log::warn!("no completion key set; advice falls back to rules");
    }

    // Set up Ctrl+C handler
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    ctrlc::set_handler({
        let shutdown_tx = shutdown_tx.clone();
        move || {
            log::info!("Received Ctrl+C, shutting down gracefully...");
            shutdown_tx.send(()).ok();
        }
    })?;

    let upstreams = LiveUpstreams::new(&config);
    let aggregator = WeatherAggregator::new(upstreams, Arc::new(MemoryCache::new()));
    let state = Arc::new(AppState { aggregator, config });

    run_http_server(state, args.port, shutdown_rx).await?;

    log::info!("Brolly stopped.");

    Ok(())
}

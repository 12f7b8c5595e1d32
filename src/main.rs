mod api;
mod config;
mod error;
mod hub;
mod quotes;
mod signals;

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::interval;
use log::{info, error};
use tower_http::cors::CorsLayer;

use crate::api::{ApiState, create_api_router};
use crate::config::{Config, STATS_INTERVAL_SECS};
use crate::hub::{run_websocket_server, BroadcastHub};
use crate::quotes::{AlphaVantageClient, QuoteAggregator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    // Log configuration
    config.log_config();

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }

    // Quote pipeline
    let provider = Arc::new(AlphaVantageClient::new(&config.upstream_base_url, &config.api_key));
    let aggregator = Arc::new(QuoteAggregator::new(
        provider,
        config.quote_symbols.clone(),
        config.fetch_timeout,
    ));

    // One hub, one timer, for the life of the process
    let hub = BroadcastHub::new(
        config.broadcast_symbols.clone(),
        config.tick_interval,
        config.subscriber_buffer,
    );
    hub.start();

    start_background_tasks(hub.clone());

    // Start API server
    let api_state = ApiState {
        aggregator,
        hub: hub.clone(),
    };

    let api_router = create_api_router(api_state)
        .layer(CorsLayer::permissive());

    let api_listener = TcpListener::bind(&config.api_bind_address).await?;
    info!("HTTP API server running at http://{}", config.api_bind_address);

    let api_server = axum::serve(api_listener, api_router);

    // Start WebSocket server
    let ws_listener = TcpListener::bind(&config.bind_address).await?;
    info!("WebSocket price feed running at ws://{}", config.bind_address);

    let websocket_server = run_websocket_server(ws_listener, hub.clone());

    // Run both servers concurrently
    tokio::select! {
        result = api_server => {
            error!("API server stopped: {:?}", result);
        }
        _ = websocket_server => {
            error!("WebSocket server stopped");
        }
    }

    hub.stop();
    Ok(())
}

fn start_background_tasks(hub: BroadcastHub) {
    tokio::spawn(async move {
        let mut interval_timer = interval(Duration::from_secs(STATS_INTERVAL_SECS));

        loop {
            interval_timer.tick().await;
            let subscribers = hub.subscriber_count();

            if subscribers > 0 {
                info!("Stats - Subscribers: {}, Hub: {:?}", subscribers, hub.state());
            }
        }
    });

    info!("Started stats monitoring task (every {} seconds)", STATS_INTERVAL_SECS);
}

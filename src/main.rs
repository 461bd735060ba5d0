use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info};

use azure_monitor_backend::api;
use azure_monitor_backend::api::handlers::AppState;
use azure_monitor_backend::config::Config;
use azure_monitor_backend::services::{Dispatcher, EndpointRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration; logging settings come from it
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.logging.env_filter())
        .with_ansi(config.logging.ansi())
        .init();

    // Shared HTTP client for every backend executor
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()?;

    // Register datasource plugins, then instantiate the configured datasource
    let mut registry = EndpointRegistry::new();
    Dispatcher::register(&mut registry, client, config.dispatch_settings()?)?;

    let datasource = config.datasource_info();
    if !datasource.has_url() {
        info!("No DATASOURCE_URL configured, only empty query buckets can be served");
    }
    let endpoint = registry.create(&datasource).map_err(|e| {
        error!("Failed to create query endpoint: {}", e);
        e
    })?;

    // Create router with state
    let app: Router = api::routes::create_router_with_state(AppState {
        config: config.clone(),
        endpoint,
    });

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use whois_lookup_api::{
    cache::{CacheService, CACHE_TTL},
    config::Config,
    metrics,
    provider::WhoisXmlClient,
    server::{router, AppState},
    LookupService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the environment may already be set
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "whois_lookup_api=info,tower_http=debug".into()),
        )
        .init();

    // Load configuration
    let config = Arc::new(Config::load()?);
    info!("Configuration loaded successfully");

    if config.whois_api_key.is_none() {
        warn!("WHOIS_API_KEY is not set; uncached lookups will fail with MISSING_API_KEY");
    }

    // Initialize services
    let provider = Arc::new(WhoisXmlClient::new(&config)?);
    let cache_service = Arc::new(CacheService::new());
    let lookup_service = LookupService::new(provider, cache_service, config.whois_api_key.clone());

    // Initialize metrics
    metrics::init_metrics();

    let app = router(AppState {
        lookup_service,
        config: config.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!("WHOIS lookup API listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("API info: http://{}/info", addr);
    info!("Allowed origin: {}", config.frontend_url);
    info!("Caching: enabled ({}s TTL)", CACHE_TTL.as_secs());
    info!("Environment: {}{}", config.environment, if config.is_production() { " (production)" } else { "" });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}

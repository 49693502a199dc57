use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use server::config::ServerConfig;
use server::provider::{HttpProvider, SpeechProvider, UnconfiguredProvider};
use server::AppState;
use tts_core::VoiceCatalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting TTS proxy server...");

    // Load configuration from environment
    let config = ServerConfig::from_env();

    let provider: Arc<dyn SpeechProvider> = match config.provider_url {
        Some(ref url) => Arc::new(HttpProvider::new(url, config.provider_timeout())?),
        None => {
            warn!("PROVIDER_URL not set, synthesis requests will fail");
            Arc::new(UnconfiguredProvider)
        }
    };

    let catalog = VoiceCatalog::builtin();
    info!("Loaded {} voices", catalog.len());

    let state = AppState::new(provider, catalog, config.clone());
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, provider_timeout={}s",
        config.port, config.rate_limit_per_minute, config.provider_timeout_secs
    );

    // Rate limiting configuration
    // GlobalKeyExtractor: all requests share the same limit
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(u64::from(config.rate_limit_per_minute / 60).max(1))
            .burst_size(config.rate_limit_per_minute.max(1))
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );

    info!("Rate limiting: {} requests per minute", config.rate_limit_per_minute);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .into_inner();

    let app = server::router(state).layer(middleware_stack);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

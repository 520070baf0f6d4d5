use anyhow::{Context, Result};
use paygate::{
    config::Config,
    dispatch::{Dispatcher, ModelCatalog, ReplicateBackend},
    handlers::{router, AppState},
    middleware::PaymentGate,
    services::*,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Misconfiguration is fatal here and never re-checked per request.
    let config = Config::from_env().context("Server misconfigured")?;

    tracing::info!("Starting paygate v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {:?}", config.environment);

    let prices = config.load_price_table().context("Server misconfigured")?;
    let catalog = ModelCatalog::default();
    catalog
        .ensure_covers(&prices)
        .map_err(|e| anyhow::anyhow!("Server misconfigured: {}", e))?;

    // Initialize services
    let chain: Arc<dyn ChainClient> =
        Arc::new(RpcChainClient::new(&config.chain_rpc_url, config.rpc_timeout)?);
    let verifier = PaymentVerifier::new(
        chain.clone(),
        ReplayGuard::new(),
        VerifierSettings {
            receiving_address: config.receiving_address,
            token_contract: config.usdc_address,
        },
    )?;
    let analytics = Arc::new(Analytics::new());
    let gate = Arc::new(PaymentGate::new(
        Arc::new(verifier),
        analytics.clone(),
        config.chain_id,
    ));

    let backend = ReplicateBackend::new(
        config.replicate_api_url.clone(),
        config.replicate_api_token.clone(),
        config.generation_timeout,
    );
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(backend), catalog));

    let state = AppState {
        gate,
        prices: Arc::new(prices),
        dispatcher,
        chain,
        analytics,
        chain_id: config.chain_id,
    };

    let app = router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!(
        "Payments: USDC {:?} -> {:?} on chain {}",
        config.usdc_address,
        config.receiving_address,
        config.chain_id
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl+c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}

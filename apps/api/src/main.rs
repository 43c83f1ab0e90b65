use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cvforge_api::config::Config;
use cvforge_api::db::create_pool;
use cvforge_api::llm_client::LlmClient;
use cvforge_api::premium::PgPurchaseLookup;
use cvforge_api::retry::AbortSignal;
use cvforge_api::routes::build_router;
use cvforge_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("cvforge_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CVForge API v{}", env!("CARGO_PKG_VERSION"));

    let retry = config.retry_policy();
    info!(
        "Retry policy: {} attempts, {}ms base, {}ms cap, timeout {:?}",
        retry.max_attempts,
        retry.base_delay.as_millis(),
        retry.max_delay.as_millis(),
        retry.timeout
    );

    // Initialize PostgreSQL (retried; Ctrl-C aborts the wait)
    let ctrl_c = AbortSignal::new();
    tokio::spawn(cancel_on_ctrl_c(ctrl_c.clone()));
    let db = create_pool(&config.database_url, &retry, &ctrl_c).await?;

    // Initialize LLM client
    let llm = LlmClient::new(
        config.llm_api_url.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    // Build app state
    let state = AppState::new(llm, config.clone(), Arc::new(PgPurchaseLookup::new(db)));
    let shutdown = state.shutdown.clone();

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the deployed frontend domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            ctrl_c.cancelled().await;
            info!("Shutdown requested, cancelling pending retries");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

/// Cancels `signal` on the first Ctrl-C.
async fn cancel_on_ctrl_c(signal: AbortSignal) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        return;
    }
    signal.cancel();
}

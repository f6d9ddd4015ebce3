mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod resumes;
mod routes;
mod scoring;
mod skills;
mod state;
mod storage;
mod text;
mod uploads;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scoring::{build_stages, PipelineConfig, ScoringOrchestrator};
use crate::state::AppState;
use crate::storage::DocumentStore;

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Local document storage
    let store = DocumentStore::open(&config.upload_dir)
        .await
        .with_context(|| format!("Cannot open upload dir {}", config.upload_dir.display()))?;
    info!("Storing uploads under {}", store.root().display());

    // Initialize LLM client
    let llm = LlmClient::new(
        config.openai_api_key.clone(),
        &config.llm_api_url,
        config.llm_model.clone(),
        config.llm_timeout,
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    // Scoring pipeline
    let stages = build_stages(&config, llm);
    let scoring = Arc::new(ScoringOrchestrator::new(
        stages,
        PipelineConfig::from_config(&config),
    ));
    info!(
        "Scoring pipeline ready (interpreter: {}, extractor: {:?}, stage timeout: {}s)",
        config.scripts.python.display(),
        config.extractor_backend,
        config.stage_timeout.as_secs()
    );

    let state = AppState { db, store, scoring };

    // Build router
    let app = build_router(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config.cors_origin.as_deref())?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Restricts CORS to one origin when configured, otherwise allows any.
fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    match origin {
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .with_context(|| format!("CORS_ORIGIN '{origin}' is not a valid header value"))?;
            Ok(CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any))
        }
        None => Ok(CorsLayer::permissive()),
    }
}

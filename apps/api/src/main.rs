mod config;
mod errors;
mod extraction;
mod fusion;
mod llm_client;
mod models;
mod routes;
mod scoring;
mod state;
mod taxonomy;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::structurer::LlmStructurer;
use crate::extraction::{HeuristicExtractor, Structurer};
use crate::llm_client::LlmClient;
use crate::models::catalog::FileCatalog;
use crate::routes::build_router;
use crate::state::AppState;
use crate::taxonomy::Taxonomy;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Compass API v{}", env!("CARGO_PKG_VERSION"));

    // Load the taxonomy once; it is immutable for the process lifetime.
    let taxonomy = match &config.taxonomy_path {
        Some(path) => Arc::new(Taxonomy::from_file(path)?),
        None => Arc::new(Taxonomy::default()),
    };
    info!(
        "Taxonomy ready: {} skill categories, {} industries",
        taxonomy.skill_categories.len(),
        taxonomy.industry_keywords.len()
    );

    // Catalog of jobs and courses to score against
    let catalog = match &config.catalog_path {
        Some(path) => Arc::new(FileCatalog::from_file(path)?),
        None => {
            warn!("CATALOG_PATH not set; starting with an empty catalog");
            Arc::new(FileCatalog::empty())
        }
    };

    // Structuring capability is optional; without it extraction degrades to
    // the heuristic path.
    let structurer: Option<Arc<dyn Structurer>> = match &config.groq_api_key {
        Some(key) => {
            info!("LLM structurer initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(LlmStructurer::new(LlmClient::new(key.clone()))))
        }
        None => {
            warn!("GROQ_API_KEY not set; extraction will run heuristic-only");
            None
        }
    };

    let heuristic = Arc::new(HeuristicExtractor::new(taxonomy.clone()));

    // Build app state
    let state = AppState {
        config: config.clone(),
        structurer,
        heuristic,
        catalog,
        taxonomy,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

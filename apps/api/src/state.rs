use std::sync::Arc;

use crate::config::Config;
use crate::extraction::{HeuristicExtractor, Structurer};
use crate::models::catalog::CatalogProvider;
use crate::taxonomy::Taxonomy;

/// Shared application state injected into all route handlers via Axum
/// extractors. Everything here is read-only after startup, so concurrent
/// requests share it freely.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable structuring capability. `None` when not configured;
    /// extraction then degrades to the heuristic path.
    pub structurer: Option<Arc<dyn Structurer>>,
    pub heuristic: Arc<HeuristicExtractor>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub taxonomy: Arc<Taxonomy>,
}

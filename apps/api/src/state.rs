use std::sync::Arc;

use sqlx::PgPool;

use crate::scoring::ScoringOrchestrator;
use crate::storage::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Uploaded résumés and job descriptions on local disk.
    pub store: DocumentStore,
    pub scoring: Arc<ScoringOrchestrator>,
}

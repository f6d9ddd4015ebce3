pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Résumés
        .route(
            "/api/v1/resumes",
            post(resumes::handle_upload).get(resumes::handle_list),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get).delete(resumes::handle_delete),
        )
        .route(
            "/api/v1/resumes/:id/status",
            patch(resumes::handle_update_status),
        )
        .route(
            "/api/v1/resumes/:id/download",
            get(resumes::handle_download),
        )
        .route("/api/v1/resumes/:id/rescore", post(resumes::handle_rescore))
        .route(
            "/api/v1/resumes/:id/analysis",
            get(resumes::handle_analysis),
        )
        // Job descriptions
        .route(
            "/api/v1/jobs",
            post(jobs::handle_upload).get(jobs::handle_list),
        )
        .route("/api/v1/jobs/manual", post(jobs::handle_create_manual))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get).delete(jobs::handle_delete),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::health::health_handler;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_service_and_version() {
        let app = Router::new().route("/health", get(health_handler));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["service"], "screener-api");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}

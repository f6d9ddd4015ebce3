use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::ingest::{create_manual_job, job_view, upload_job};
use crate::jobs::repository::{delete_job, list_jobs};
use crate::models::job::JobDescriptionView;
use crate::resumes::ingest::require_job;
use crate::state::AppState;
use crate::uploads::UploadForm;

/// POST /api/v1/jobs
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobDescriptionView>), AppError> {
    let mut form = UploadForm::from_multipart(multipart).await?;
    let file = form.require_file()?;
    let title = form.require_text("title")?;

    let job = upload_job(&state, title, file).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[derive(Deserialize)]
pub struct ManualJobRequest {
    pub title: String,
    pub description_text: String,
}

/// POST /api/v1/jobs/manual
pub async fn handle_create_manual(
    State(state): State<AppState>,
    Json(req): Json<ManualJobRequest>,
) -> Result<(StatusCode, Json<JobDescriptionView>), AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title must not be empty".to_string()));
    }
    if req.description_text.trim().is_empty() {
        return Err(AppError::Validation(
            "Description text must not be empty".to_string(),
        ));
    }

    let job = create_manual_job(&state, title, &req.description_text).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobDescriptionView>>, AppError> {
    let mut views = Vec::new();
    for row in list_jobs(&state.db).await? {
        views.push(job_view(&state.db, row).await?);
    }
    Ok(Json(views))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDescriptionView>, AppError> {
    let row = require_job(&state.db, id).await?;
    Ok(Json(job_view(&state.db, row).await?))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let row = delete_job(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    if let Some(path) = row.file_path.as_deref() {
        state.store.remove(std::path::Path::new(path)).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{ResumeAnalysis, ResumeDetail, ResumeRow};
use crate::resumes::ingest::{
    require_job, require_resume, rescore_resume, resume_detail, upload_resume, ResumeUpload,
};
use crate::resumes::repository::{delete_resume, list_resumes, update_status};
use crate::state::AppState;
use crate::uploads::UploadForm;

const MAX_STATUS_LEN: usize = 32;

/// POST /api/v1/resumes
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeDetail>), AppError> {
    let mut form = UploadForm::from_multipart(multipart).await?;
    let file = form.require_file()?;
    let candidate_name = form.require_text("candidate_name")?.to_string();
    let job_id = form.text("job_id").map(parse_uuid).transpose()?;

    let detail = upload_resume(
        &state,
        ResumeUpload {
            file,
            candidate_name,
            job_id,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/v1/resumes
pub async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<ResumeRow>>, AppError> {
    Ok(Json(list_resumes(&state.db).await?))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDetail>, AppError> {
    Ok(Json(resume_detail(&state.db, id).await?))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let row = delete_resume(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;
    state.store.remove(std::path::Path::new(&row.file_path)).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// PATCH /api/v1/resumes/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<ResumeRow>, AppError> {
    let status = validate_status(&req.status)?;
    let row = update_status(&state.db, id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;
    Ok(Json(row))
}

/// GET /api/v1/resumes/:id/download
pub async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let row = require_resume(&state.db, id).await?;
    let bytes = tokio::fs::read(&row.file_path).await.map_err(|e| {
        tracing::error!("Stored file for resume {id} is unreadable: {e}");
        AppError::NotFound(format!("File for resume {id} not found"))
    })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        row.file_name.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, row.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

#[derive(Deserialize)]
pub struct RescoreRequest {
    pub job_id: Uuid,
}

/// POST /api/v1/resumes/:id/rescore
pub async fn handle_rescore(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RescoreRequest>,
) -> Result<Json<ResumeAnalysis>, AppError> {
    Ok(Json(rescore_resume(&state, id, req.job_id).await?))
}

#[derive(Deserialize)]
pub struct AnalysisQuery {
    pub job_id: Uuid,
}

/// GET /api/v1/resumes/:id/analysis?job_id=
pub async fn handle_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<ResumeAnalysis>, AppError> {
    let resume = require_resume(&state.db, id).await?;
    let job = require_job(&state.db, params.job_id).await?;
    Ok(Json(resume.analysis_for(job.id)))
}

fn parse_uuid(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid job id '{raw}'")))
}

fn validate_status(raw: &str) -> Result<&str, AppError> {
    let status = raw.trim();
    if status.is_empty() {
        return Err(AppError::Validation("Status must not be empty".to_string()));
    }
    if status.chars().count() > MAX_STATUS_LEN {
        return Err(AppError::Validation(format!(
            "Status must be at most {MAX_STATUS_LEN} characters"
        )));
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_trimmed_and_bounded() {
        assert_eq!(validate_status("  Shortlisted ").unwrap(), "Shortlisted");
        assert!(validate_status("   ").is_err());
        assert!(validate_status(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_job_id_must_be_a_uuid() {
        assert!(parse_uuid("42").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string()).unwrap(), id);
    }
}

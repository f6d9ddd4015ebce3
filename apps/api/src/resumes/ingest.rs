//! Résumé upload and rescoring.
//!
//! Upload: validate, store, run the pipeline (full scoring when a job is
//! given, extraction and parsing otherwise), then persist the résumé and its
//! scores in one transaction. A failed pipeline or write removes the stored
//! file and persists nothing.

use std::path::PathBuf;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::repository::find_job;
use crate::models::job::JobDescriptionRow;
use crate::models::resume::{ResumeAnalysis, ResumeDetail, ResumeRow};
use crate::resumes::repository::{
    apply_scores, experiences_for, find_resume, insert_resume, NewResume,
};
use crate::scoring::{JobDocument, ResumeDocument, ScoreBundle, ScoringOrchestrator};
use crate::skills::resume_skill_names;
use crate::state::AppState;
use crate::storage::DocumentKind;
use crate::uploads::UploadedFile;

/// A validated résumé upload.
pub struct ResumeUpload {
    pub file: UploadedFile,
    pub candidate_name: String,
    pub job_id: Option<Uuid>,
}

/// Accepts PDF and DOCX résumés only.
pub fn resume_kind(file: &UploadedFile) -> Result<DocumentKind, AppError> {
    match DocumentKind::detect(file.content_type.as_deref(), &file.file_name) {
        Some(kind @ (DocumentKind::Pdf | DocumentKind::Docx)) => Ok(kind),
        _ => Err(AppError::UnsupportedMediaType(
            "Only PDF or DOCX résumés are accepted".to_string(),
        )),
    }
}

/// Rejects documents the configured text extractor cannot read, before
/// anything is stored.
pub fn ensure_extractable(scoring: &ScoringOrchestrator, kind: DocumentKind) -> Result<(), AppError> {
    if scoring.can_extract(kind) {
        Ok(())
    } else {
        Err(AppError::UnsupportedMediaType(format!(
            "{kind:?} documents are not supported by the configured text extractor"
        )))
    }
}

pub async fn upload_resume(state: &AppState, upload: ResumeUpload) -> Result<ResumeDetail, AppError> {
    let kind = resume_kind(&upload.file)?;
    ensure_extractable(&state.scoring, kind)?;
    if upload.file.bytes.is_empty() {
        return Err(AppError::Validation("File is empty".to_string()));
    }

    // Resolve the job before any work so an unknown id costs nothing.
    let job = match upload.job_id {
        Some(job_id) => Some(require_job(&state.db, job_id).await?),
        None => None,
    };

    let path = state
        .store
        .store(&upload.file.file_name, &upload.file.bytes)
        .await?;

    match persist_upload(state, &upload, kind, &path, job.as_ref()).await {
        Ok(detail) => Ok(detail),
        Err(e) => {
            state.store.remove(&path).await;
            Err(e)
        }
    }
}

async fn persist_upload(
    state: &AppState,
    upload: &ResumeUpload,
    kind: DocumentKind,
    path: &std::path::Path,
    job: Option<&JobDescriptionRow>,
) -> Result<ResumeDetail, AppError> {
    let document = ResumeDocument {
        path: path.to_path_buf(),
    };

    let (prepared, scored) = match job {
        Some(job) => {
            let run = state.scoring.score(&document, &job_document(job)).await?;
            (run.resume, Some((job.id, run.bundle)))
        }
        None => (state.scoring.prepare_resume(&document).await?, None),
    };

    let file_path = path.to_string_lossy();
    let mut tx = state.db.begin().await?;
    let mut row = insert_resume(
        &mut *tx,
        NewResume {
            file_name: upload.file.file_name.trim(),
            candidate_name: &upload.candidate_name,
            file_path: &file_path,
            content_type: kind.content_type(),
            size_bytes: upload.file.bytes.len() as i64,
            parsed: &prepared.parsed.fields,
        },
    )
    .await?;
    if let Some((job_id, bundle)) = &scored {
        row = apply_scores(&mut *tx, row.id, *job_id, bundle).await?;
    }
    let detail = load_detail(&mut *tx, row).await?;
    tx.commit().await?;

    info!(
        "Uploaded resume {} ({} chars of text, scored: {})",
        detail.resume.id,
        prepared.text.chars().count(),
        scored.is_some()
    );
    Ok(detail)
}

/// Scores a stored résumé against a job and overwrites its previous scores.
pub async fn rescore_resume(
    state: &AppState,
    resume_id: Uuid,
    job_id: Uuid,
) -> Result<ResumeAnalysis, AppError> {
    let resume = require_resume(&state.db, resume_id).await?;
    let job = require_job(&state.db, job_id).await?;

    let bundle = score_stored(&state.scoring, &resume, &job).await?;

    let mut conn = state.db.acquire().await?;
    let row = apply_scores(&mut *conn, resume.id, job.id, &bundle).await?;
    info!(
        "Rescored resume {} against job {}: final={:.1}",
        row.id, job.id, bundle.final_score
    );
    Ok(row.analysis_for(job.id))
}

async fn score_stored(
    scoring: &ScoringOrchestrator,
    resume: &ResumeRow,
    job: &JobDescriptionRow,
) -> Result<ScoreBundle, AppError> {
    let document = ResumeDocument {
        path: PathBuf::from(&resume.file_path),
    };
    let run = scoring.score(&document, &job_document(job)).await?;
    Ok(run.bundle)
}

pub async fn resume_detail(pool: &PgPool, resume_id: Uuid) -> Result<ResumeDetail, AppError> {
    let row = require_resume(pool, resume_id).await?;
    let mut conn = pool.acquire().await?;
    load_detail(&mut *conn, row).await
}

async fn load_detail(
    conn: &mut sqlx::PgConnection,
    resume: ResumeRow,
) -> Result<ResumeDetail, AppError> {
    let skills = resume_skill_names(conn, resume.id).await?;
    let experiences = experiences_for(conn, resume.id).await?;
    Ok(ResumeDetail {
        resume,
        skills,
        experiences,
    })
}

pub async fn require_resume(pool: &PgPool, id: Uuid) -> Result<ResumeRow, AppError> {
    find_resume(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

pub async fn require_job(pool: &PgPool, id: Uuid) -> Result<JobDescriptionRow, AppError> {
    find_job(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

fn job_document(job: &JobDescriptionRow) -> JobDocument {
    JobDocument {
        id: job.id,
        description_text: job.description_text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn upload(name: &str, content_type: Option<&str>) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from_static(b"%PDF-1.4"),
        }
    }

    #[test]
    fn test_pdf_and_docx_are_accepted() {
        assert_eq!(
            resume_kind(&upload("cv.pdf", Some("application/pdf"))).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            resume_kind(&upload("cv.docx", Some("application/octet-stream"))).unwrap(),
            DocumentKind::Docx
        );
    }

    #[test]
    fn test_plain_text_resume_is_rejected() {
        assert!(matches!(
            resume_kind(&upload("cv.txt", Some("text/plain"))),
            Err(AppError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            resume_kind(&upload("cv.png", None)),
            Err(AppError::UnsupportedMediaType(_))
        ));
    }
}

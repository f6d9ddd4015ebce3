//! Job description ingestion: store the document, extract and parse it,
//! clean the parser output and persist. Jobs are parsed once, at creation.

use std::path::Path;

use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::jobs::repository::{insert_job, NewJob};
use crate::models::job::{JobDescriptionRow, JobDescriptionView};
use crate::resumes::ingest::ensure_extractable;
use crate::scoring::parsed::ParsedJob;
use crate::scoring::PreparedJob;
use crate::skills::job_skill_names;
use crate::state::AppState;
use crate::storage::DocumentKind;
use crate::text::{join_list, strip_citations};
use crate::uploads::UploadedFile;

/// Parser fields as they are stored: citation markers removed and lists
/// joined with ", ".
#[derive(Debug, Clone, PartialEq)]
pub struct CleanJobFields {
    pub summary: Option<String>,
    pub requirements: String,
    pub responsibilities: String,
}

pub fn clean_job_fields(parsed: &ParsedJob) -> CleanJobFields {
    CleanJobFields {
        summary: parsed
            .summary
            .as_deref()
            .map(strip_citations)
            .filter(|s| !s.is_empty()),
        requirements: strip_citations(&join_list(&parsed.requirements)),
        responsibilities: strip_citations(&join_list(&parsed.responsibilities)),
    }
}

/// POST /api/v1/jobs: any document the extractor understands.
pub async fn upload_job(
    state: &AppState,
    title: &str,
    file: UploadedFile,
) -> Result<JobDescriptionView, AppError> {
    let kind = DocumentKind::detect(file.content_type.as_deref(), &file.file_name).ok_or_else(|| {
        AppError::UnsupportedMediaType(
            "Only PDF, DOCX or plain text job descriptions are accepted".to_string(),
        )
    })?;
    ensure_extractable(&state.scoring, kind)?;
    let path = state.store.store(&file.file_name, &file.bytes).await?;

    let result = match state.scoring.ingest_job(&path).await {
        Ok(prepared) => persist_job(state, title, &prepared, &path).await,
        Err(e) => Err(e.into()),
    };
    remove_on_error(state, &path, result).await
}

/// POST /api/v1/jobs/manual: the description is typed in directly.
pub async fn create_manual_job(
    state: &AppState,
    title: &str,
    description_text: &str,
) -> Result<JobDescriptionView, AppError> {
    let path = state.store.store_text(description_text, "job-", ".txt").await?;

    let prepared = state
        .scoring
        .ingest_job_text(&path, description_text.to_string())
        .await;
    let result = match prepared {
        Ok(prepared) => persist_job(state, title, &prepared, &path).await,
        Err(e) => Err(e.into()),
    };
    remove_on_error(state, &path, result).await
}

async fn remove_on_error<T>(
    state: &AppState,
    path: &Path,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    if result.is_err() {
        state.store.remove(path).await;
    }
    result
}

async fn persist_job(
    state: &AppState,
    title: &str,
    prepared: &PreparedJob,
    path: &Path,
) -> Result<JobDescriptionView, AppError> {
    let fields = &prepared.parsed.fields;
    let clean = clean_job_fields(fields);
    let file_path = path.to_string_lossy();

    let mut tx = state.db.begin().await?;
    let row = insert_job(
        &mut *tx,
        NewJob {
            title,
            category: fields.category.as_deref(),
            location: fields.location.as_deref(),
            description_text: &prepared.text,
            summary: clean.summary.as_deref(),
            requirements: &clean.requirements,
            responsibilities: &clean.responsibilities,
            parsed_json: &prepared.parsed.raw,
            file_path: &file_path,
            skills: &fields.skills,
        },
    )
    .await?;
    let skills = job_skill_names(&mut *tx, row.id).await?;
    tx.commit().await?;

    info!("Created job {} from {}", row.id, path.display());
    Ok(row.into_view(skills))
}

pub async fn job_view(pool: &PgPool, row: JobDescriptionRow) -> Result<JobDescriptionView, AppError> {
    let mut conn = pool.acquire().await?;
    let skills = job_skill_names(&mut *conn, row.id).await?;
    Ok(row.into_view(skills))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_job_fields_strips_markers_and_joins_lists() {
        let parsed = ParsedJob {
            category: Some("Engineer".into()),
            location: Some("Austin, TX".into()),
            summary: Some("Build APIs.\u{E200}cite\u{E201}".into()),
            skills: vec!["Java".into()],
            requirements: vec!["5 years Java".into(), "SQL\u{E200}turn0\u{E201}".into()],
            responsibilities: vec!["Ship features".into()],
        };

        let clean = clean_job_fields(&parsed);

        assert_eq!(clean.summary.as_deref(), Some("Build APIs."));
        assert_eq!(clean.requirements, "5 years Java, SQL");
        assert_eq!(clean.responsibilities, "Ship features");
    }

    #[test]
    fn test_clean_job_fields_with_empty_parser_output() {
        let clean = clean_job_fields(&ParsedJob::default());
        assert_eq!(clean.summary, None);
        assert_eq!(clean.requirements, "");
        assert_eq!(clean.responsibilities, "");
    }
}

use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::models::resume::{ExperienceRow, ResumeRow};
use crate::scoring::parsed::ParsedResume;
use crate::scoring::ScoreBundle;
use crate::skills::fetch_or_create_skills;

/// Parameters for inserting a freshly parsed résumé.
pub struct NewResume<'a> {
    pub file_name: &'a str,
    pub candidate_name: &'a str,
    pub file_path: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
    pub parsed: &'a ParsedResume,
}

/// Inserts the résumé row, its experience and its skill links.
/// Runs on the caller's connection so it can share a transaction with scoring.
pub async fn insert_resume(
    conn: &mut PgConnection,
    params: NewResume<'_>,
) -> Result<ResumeRow, sqlx::Error> {
    let NewResume {
        file_name,
        candidate_name,
        file_path,
        content_type,
        size_bytes,
        parsed,
    } = params;

    let row = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes
            (id, file_name, candidate_name, file_path, content_type, size_bytes,
             email, phone, summary, education, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'New')
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(file_name)
    .bind(candidate_name)
    .bind(file_path)
    .bind(content_type)
    .bind(size_bytes)
    .bind(parsed.email.as_deref())
    .bind(parsed.phone_number.as_deref())
    .bind(parsed.summary.as_deref())
    .bind(parsed.education.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    if let Some(description) = parsed
        .work_experience
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        sqlx::query("INSERT INTO experiences (id, resume_id, description) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(description)
            .execute(&mut *conn)
            .await?;
    }

    let skills = fetch_or_create_skills(conn, &parsed.skills).await?;
    for skill in &skills {
        sqlx::query(
            "INSERT INTO resume_skills (resume_id, skill_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(row.id)
        .bind(skill.id)
        .execute(&mut *conn)
        .await?;
    }

    info!(
        "Inserted resume {} for {candidate_name} with {} skills",
        row.id,
        skills.len()
    );
    Ok(row)
}

/// Replaces every score field of a résumé with `bundle`, computed against `job_id`.
pub async fn apply_scores(
    conn: &mut PgConnection,
    resume_id: Uuid,
    job_id: Uuid,
    bundle: &ScoreBundle,
) -> Result<ResumeRow, sqlx::Error> {
    let signals: Vec<&str> = bundle.degraded_signals.iter().map(|s| s.as_str()).collect();

    sqlx::query_as::<_, ResumeRow>(
        r#"
        UPDATE resumes SET
            final_score = $2,
            semantic_score = $3,
            skills_score = $4,
            education_score = $5,
            experience_score = $6,
            overlap_score = $7,
            llm_score = $8,
            score_degraded = $9,
            degraded_signals = $10,
            last_scored_job_id = $11,
            scored_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(resume_id)
    .bind(bundle.final_score)
    .bind(bundle.semantic_score)
    .bind(bundle.skills_score)
    .bind(bundle.education_score)
    .bind(bundle.experience_score)
    .bind(bundle.overlap)
    .bind(bundle.llm_score)
    .bind(bundle.degraded)
    .bind(&signals)
    .bind(job_id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn find_resume(pool: &PgPool, id: Uuid) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_resumes(pool: &PgPool) -> Result<Vec<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes ORDER BY uploaded_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn experiences_for(
    conn: &mut PgConnection,
    resume_id: Uuid,
) -> Result<Vec<ExperienceRow>, sqlx::Error> {
    sqlx::query_as::<_, ExperienceRow>(
        "SELECT * FROM experiences WHERE resume_id = $1 ORDER BY created_at",
    )
    .bind(resume_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: &str,
) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("UPDATE resumes SET status = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
}

/// Deletes a résumé with its experiences and skill links. Skills stay.
pub async fn delete_resume(pool: &PgPool, id: Uuid) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("DELETE FROM resumes WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
}

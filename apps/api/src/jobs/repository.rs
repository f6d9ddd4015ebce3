use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::models::job::JobDescriptionRow;
use crate::skills::fetch_or_create_skills;

/// Parameters for inserting a parsed job description.
pub struct NewJob<'a> {
    pub title: &'a str,
    pub category: Option<&'a str>,
    pub location: Option<&'a str>,
    pub description_text: &'a str,
    pub summary: Option<&'a str>,
    pub requirements: &'a str,
    pub responsibilities: &'a str,
    pub parsed_json: &'a serde_json::Value,
    pub file_path: &'a str,
    pub skills: &'a [String],
}

pub async fn insert_job(
    conn: &mut PgConnection,
    params: NewJob<'_>,
) -> Result<JobDescriptionRow, sqlx::Error> {
    let row = sqlx::query_as::<_, JobDescriptionRow>(
        r#"
        INSERT INTO job_descriptions
            (id, title, category, location, description_text, summary,
             requirements, responsibilities, parsed_json, file_path)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(params.title)
    .bind(params.category)
    .bind(params.location)
    .bind(params.description_text)
    .bind(params.summary)
    .bind(params.requirements)
    .bind(params.responsibilities)
    .bind(params.parsed_json)
    .bind(params.file_path)
    .fetch_one(&mut *conn)
    .await?;

    let skills = fetch_or_create_skills(conn, params.skills).await?;
    for skill in &skills {
        sqlx::query("INSERT INTO job_skills (job_id, skill_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(row.id)
            .bind(skill.id)
            .execute(&mut *conn)
            .await?;
    }

    info!("Inserted job {} '{}' with {} skills", row.id, row.title, skills.len());
    Ok(row)
}

pub async fn find_job(pool: &PgPool, id: Uuid) -> Result<Option<JobDescriptionRow>, sqlx::Error> {
    sqlx::query_as::<_, JobDescriptionRow>("SELECT * FROM job_descriptions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_jobs(pool: &PgPool) -> Result<Vec<JobDescriptionRow>, sqlx::Error> {
    sqlx::query_as::<_, JobDescriptionRow>("SELECT * FROM job_descriptions ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

/// Deletes a job. Résumés scored against it keep their scores but lose the
/// job reference.
pub async fn delete_job(pool: &PgPool, id: Uuid) -> Result<Option<JobDescriptionRow>, sqlx::Error> {
    sqlx::query_as::<_, JobDescriptionRow>("DELETE FROM job_descriptions WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
}

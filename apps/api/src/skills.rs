//! Skill normalization and lazy creation.
//!
//! Skills are shared by résumés and jobs and keyed by a lowercase,
//! whitespace-collapsed form of the name. Creation is an upsert on that key,
//! so the same name arriving twice (in one request or concurrently) yields
//! one row. Orphaned skills are never deleted.

use sqlx::{Connection, PgConnection};
use tracing::debug;
use uuid::Uuid;

use crate::models::skill::SkillRow;

/// Trims, collapses internal whitespace, drops blanks and dedupes
/// case-insensitively. The first spelling of a name wins.
pub fn normalize_skill_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|name| collapse_whitespace(name.as_ref()))
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(skill_key(name)))
        .collect()
}

/// The unique key a skill is stored under.
pub fn skill_key(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

fn collapse_whitespace(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized names in `name_key` order. Transactions that upsert
/// overlapping skill sets take the key locks in the same order, so two
/// uploads naming `[Java, SQL]` and `[SQL, Java]` cannot deadlock.
pub fn upsert_order<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut names = normalize_skill_names(names);
    names.sort_by_cached_key(|name| skill_key(name));
    names
}

/// Returns a row for every normalized name, creating the missing ones.
pub async fn fetch_or_create_skills(
    conn: &mut PgConnection,
    names: &[String],
) -> Result<Vec<SkillRow>, sqlx::Error> {
    let mut rows = Vec::new();
    for name in upsert_order(names) {
        rows.push(fetch_or_create_skill(conn, &name).await?);
    }
    Ok(rows)
}

/// What to do after the conflict-tolerant insert.
#[derive(Debug)]
enum Upsert {
    Created(SkillRow),
    /// Another transaction owns the key; keep the savepoint and look it up.
    Existing,
    /// A racing insert raised `unique_violation`; roll back, then look up.
    Raced,
}

fn classify_insert(result: Result<Option<SkillRow>, sqlx::Error>) -> Result<Upsert, sqlx::Error> {
    match result {
        Ok(Some(row)) => Ok(Upsert::Created(row)),
        Ok(None) => Ok(Upsert::Existing),
        Err(e) if is_unique_violation(&e) => Ok(Upsert::Raced),
        Err(e) => Err(e),
    }
}

async fn fetch_or_create_skill(conn: &mut PgConnection, name: &str) -> Result<SkillRow, sqlx::Error> {
    let key = skill_key(name);

    // Savepoint so a racing unique violation does not abort the caller's transaction.
    let mut savepoint = conn.begin().await?;
    let inserted = sqlx::query_as::<_, SkillRow>(
        r#"
        INSERT INTO skills (id, name, name_key)
        VALUES ($1, $2, $3)
        ON CONFLICT (name_key) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(&key)
    .fetch_optional(&mut *savepoint)
    .await;

    match classify_insert(inserted) {
        Ok(Upsert::Created(row)) => {
            savepoint.commit().await?;
            debug!("Created skill {name:?}");
            Ok(row)
        }
        Ok(Upsert::Existing) => {
            savepoint.commit().await?;
            find_skill(conn, &key).await
        }
        Ok(Upsert::Raced) => {
            savepoint.rollback().await?;
            find_skill(conn, &key).await
        }
        Err(e) => Err(e),
    }
}

async fn find_skill(conn: &mut PgConnection, key: &str) -> Result<SkillRow, sqlx::Error> {
    sqlx::query_as::<_, SkillRow>("SELECT * FROM skills WHERE name_key = $1")
        .bind(key)
        .fetch_one(&mut *conn)
        .await
}

/// Postgres `unique_violation`.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// Names of the skills linked to a résumé, alphabetically.
pub async fn resume_skill_names(
    conn: &mut PgConnection,
    resume_id: Uuid,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT s.name FROM skills s
        JOIN resume_skills rs ON rs.skill_id = s.id
        WHERE rs.resume_id = $1
        ORDER BY s.name_key
        "#,
    )
    .bind(resume_id)
    .fetch_all(&mut *conn)
    .await
}

/// Names of the skills linked to a job, alphabetically.
pub async fn job_skill_names(
    conn: &mut PgConnection,
    job_id: Uuid,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT s.name FROM skills s
        JOIN job_skills js ON js.skill_id = s.id
        WHERE js.job_id = $1
        ORDER BY s.name_key
        "#,
    )
    .bind(job_id)
    .fetch_all(&mut *conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_collapses_whitespace() {
        let names = normalize_skill_names(&["  Machine   Learning ", "SQL\t", ""]);
        assert_eq!(names, vec!["Machine Learning", "SQL"]);
    }

    #[test]
    fn test_normalize_dedupes_case_insensitively_first_wins() {
        let names = normalize_skill_names(&["Java", "JAVA", " java ", "PostgreSQL", "postgresql"]);
        assert_eq!(names, vec!["Java", "PostgreSQL"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_skill_names(&["Rust", " rust", "Go  Lang", "go lang"]);
        let twice = normalize_skill_names(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_skill_key_ignores_case_and_spacing() {
        assert_eq!(skill_key(" Spring   Boot "), "spring boot");
        assert_eq!(skill_key("SPRING BOOT"), skill_key("spring boot"));
    }

    #[test]
    fn test_non_database_error_is_not_a_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn test_upsert_order_is_independent_of_parser_order() {
        let first = upsert_order(&["Java", "SQL", "docker"]);
        let second = upsert_order(&["docker", "SQL", "Java"]);
        assert_eq!(first, vec!["docker", "Java", "SQL"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_upsert_order_sorts_by_key_and_keeps_first_spelling() {
        let names = upsert_order(&["sql", " Rust ", "Ada", "SQL", "rust"]);
        assert_eq!(names, vec!["Ada", "Rust", "sql"]);
    }

    /// A database error with a chosen SQLSTATE.
    #[derive(Debug, thiserror::Error)]
    #[error("database error {code}")]
    struct CodedError {
        code: &'static str,
    }

    impl sqlx::error::DatabaseError for CodedError {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.code.into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.code {
                "23505" => sqlx::error::ErrorKind::UniqueViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(CodedError { code }))
    }

    #[test]
    fn test_conflicting_insert_falls_back_to_lookup() {
        assert!(matches!(classify_insert(Ok(None)), Ok(Upsert::Existing)));
    }

    #[test]
    fn test_racing_unique_violation_falls_back_to_lookup() {
        assert!(is_unique_violation(&db_error("23505")));
        assert!(matches!(
            classify_insert(Err(db_error("23505"))),
            Ok(Upsert::Raced)
        ));
    }

    #[test]
    fn test_other_database_errors_propagate() {
        assert!(matches!(
            classify_insert(Err(db_error("40P01"))),
            Err(sqlx::Error::Database(_))
        ));
    }
}

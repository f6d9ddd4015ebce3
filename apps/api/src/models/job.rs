use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::text::split_csv;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobDescriptionRow {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub description_text: String,
    pub summary: Option<String>,
    /// Requirements joined with ", ".
    pub requirements: Option<String>,
    /// Responsibilities joined with ", ".
    pub responsibilities: Option<String>,
    pub parsed_json: Option<Value>,
    pub file_path: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// API view of a job description, with list fields split back out.
#[derive(Debug, Clone, Serialize)]
pub struct JobDescriptionView {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub skills: Vec<String>,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl JobDescriptionRow {
    pub fn into_view(self, skills: Vec<String>) -> JobDescriptionView {
        JobDescriptionView {
            id: self.id,
            title: self.title,
            category: self.category,
            location: self.location,
            summary: self.summary,
            skills,
            requirements: self.requirements.as_deref().map(split_csv).unwrap_or_default(),
            responsibilities: self
                .responsibilities
                .as_deref()
                .map(split_csv)
                .unwrap_or_default(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

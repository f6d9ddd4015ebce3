use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::scoring::{ScoreBundle, Signal};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub file_name: String,
    pub candidate_name: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub summary: Option<String>,
    pub education: Option<String>,
    pub status: String,
    pub final_score: Option<f64>,
    pub semantic_score: Option<f64>,
    pub skills_score: Option<f64>,
    pub education_score: Option<f64>,
    pub experience_score: Option<f64>,
    pub overlap_score: Option<f64>,
    pub llm_score: Option<f64>,
    pub score_degraded: bool,
    pub degraded_signals: Vec<String>,
    pub last_scored_job_id: Option<Uuid>,
    pub scored_at: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExperienceRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl ResumeRow {
    /// The persisted bundle, if this résumé has ever been scored.
    /// A row is either fully scored or not scored at all.
    pub fn score_bundle(&self) -> Option<ScoreBundle> {
        Some(ScoreBundle {
            final_score: self.final_score?,
            semantic_score: self.semantic_score?,
            skills_score: self.skills_score?,
            education_score: self.education_score?,
            experience_score: self.experience_score?,
            overlap: self.overlap_score?,
            llm_score: self.llm_score?,
            degraded: self.score_degraded,
            degraded_signals: self
                .degraded_signals
                .iter()
                .filter_map(|s| Signal::parse(s))
                .collect(),
        })
    }

    /// Scores as they apply to `job_id`. Scores computed against another job
    /// are reported as stale and withheld.
    pub fn analysis_for(&self, job_id: Uuid) -> ResumeAnalysis {
        let scored_against_job = self.last_scored_job_id == Some(job_id);
        let bundle = self.score_bundle();
        ResumeAnalysis {
            resume_id: self.id,
            job_id,
            scored_job_id: self.last_scored_job_id,
            stale: bundle.is_some() && !scored_against_job,
            scored_at: if scored_against_job { self.scored_at } else { None },
            scores: if scored_against_job { bundle } else { None },
        }
    }
}

/// A résumé with its skills and experiences.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeDetail {
    #[serde(flatten)]
    pub resume: ResumeRow,
    pub skills: Vec<String>,
    pub experiences: Vec<ExperienceRow>,
}

/// Scores of one résumé for one job.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeAnalysis {
    pub resume_id: Uuid,
    pub job_id: Uuid,
    /// The job the stored scores were computed against, if any.
    pub scored_job_id: Option<Uuid>,
    /// True when stored scores exist but belong to a different job.
    pub stale: bool,
    pub scored_at: Option<DateTime<Utc>>,
    pub scores: Option<ScoreBundle>,
}

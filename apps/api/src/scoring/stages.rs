//! The six pipeline capabilities. The orchestrator depends only on these
//! traits; implementations may shell out, run in-process or call a service.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::scoring::bundle::BlendedScores;
use crate::scoring::parsed::{ParsedDocument, ParsedJob, ParsedResume};
use crate::scoring::process::ScriptError;
use crate::storage::DocumentKind;

/// One step of the scoring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TextExtraction,
    ResumeParsing,
    JobParsing,
    SemanticMatching,
    LlmComparison,
    ScoreBlending,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::TextExtraction => "text extraction",
            Stage::ResumeParsing => "resume parsing",
            Stage::JobParsing => "job parsing",
            Stage::SemanticMatching => "semantic matching",
            Stage::LlmComparison => "LLM comparison",
            Stage::ScoreBlending => "score blending",
        }
    }

    /// Fatal stages abort the request; the others degrade to a neutral 0.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Stage::SemanticMatching | Stage::LlmComparison)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("malformed output: {0}")]
    MalformedOutput(String),

    #[error("unsupported document: {0}")]
    Unsupported(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the blender needs, serialized as its stdin payload.
#[derive(Debug, Serialize)]
pub struct BlendRequest<'a> {
    pub resume_text: &'a str,
    pub job_text: &'a str,
    pub resume_json: &'a Value,
    pub job_json: &'a Value,
    #[serde(rename = "Overlap")]
    pub overlap: f64,
    #[serde(rename = "LLMscore")]
    pub llm_score: f64,
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: &Path) -> Result<String, StageError>;

    /// Whether documents of this kind can be extracted at all.
    fn supports(&self, _kind: DocumentKind) -> bool {
        true
    }
}

#[async_trait]
pub trait ResumeParser: Send + Sync {
    async fn parse(&self, document: &Path) -> Result<ParsedDocument<ParsedResume>, StageError>;
}

#[async_trait]
pub trait JobParser: Send + Sync {
    async fn parse(&self, document: &Path) -> Result<ParsedDocument<ParsedJob>, StageError>;
}

#[async_trait]
pub trait SemanticMatcher: Send + Sync {
    /// Overlap percentage between two whole documents.
    async fn overlap(&self, resume: &Path, job: &Path) -> Result<f64, StageError>;
}

#[async_trait]
pub trait LlmComparator: Send + Sync {
    /// Compatibility number judged from the two parsed documents.
    async fn compare(&self, resume_json: &Value, job_json: &Value) -> Result<f64, StageError>;
}

#[async_trait]
pub trait ScoreBlender: Send + Sync {
    async fn blend(&self, request: &BlendRequest<'_>) -> Result<BlendedScores, StageError>;
}

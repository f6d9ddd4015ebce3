//! Scoring orchestrator.
//!
//! Sequences the six stages for one (résumé, job) pair and applies the
//! failure policy:
//! - text extraction, both parsers and the blender are fatal;
//! - the semantic matcher and the LLM comparator degrade to 0 and are
//!   recorded on the bundle.
//!
//! Every stage runs under an explicit timeout. A timeout counts as a failure
//! of that stage and follows the same policy.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::scoring::bundle::{AuxSignal, ScoreBundle};
use crate::scoring::parsed::{ParsedDocument, ParsedJob, ParsedResume};
use crate::scoring::stages::{
    BlendRequest, JobParser, LlmComparator, ResumeParser, ScoreBlender, SemanticMatcher, Stage,
    StageError, TextExtractor,
};
use crate::storage::DocumentKind;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("{stage} timed out after {}s", .after.as_secs())]
    Timeout { stage: Stage, after: Duration },

    #[error("could not prepare the scoring workspace: {0}")]
    Workspace(#[from] std::io::Error),
}

impl PipelineError {
    /// The stage that failed, if the failure belongs to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Stage { stage, .. } | PipelineError::Timeout { stage, .. } => {
                Some(*stage)
            }
            PipelineError::Workspace(_) => None,
        }
    }
}

/// Per-stage time limits.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub stage_timeout: Duration,
    pub llm_timeout: Duration,
}

/// The stage implementations the orchestrator is built from.
#[derive(Clone)]
pub struct ScoringStages {
    pub text_extractor: Arc<dyn TextExtractor>,
    pub resume_parser: Arc<dyn ResumeParser>,
    pub job_parser: Arc<dyn JobParser>,
    pub semantic_matcher: Arc<dyn SemanticMatcher>,
    pub llm_comparator: Arc<dyn LlmComparator>,
    pub score_blender: Arc<dyn ScoreBlender>,
}

/// A stored résumé document.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub path: PathBuf,
}

/// A job as the pipeline sees it: its plain description text.
#[derive(Debug, Clone)]
pub struct JobDocument {
    pub id: Uuid,
    pub description_text: String,
}

/// Extracted text and parser output for one résumé.
#[derive(Debug, Clone)]
pub struct PreparedResume {
    pub text: String,
    pub parsed: ParsedDocument<ParsedResume>,
}

/// Extracted text and parser output for one job description.
#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub text: String,
    pub parsed: ParsedDocument<ParsedJob>,
}

/// Everything one scoring run produced. The parsed résumé is kept so the
/// caller can persist it without parsing twice.
#[derive(Debug, Clone)]
pub struct ScoringRun {
    pub resume: PreparedResume,
    pub job: ParsedDocument<ParsedJob>,
    pub bundle: ScoreBundle,
}

pub struct ScoringOrchestrator {
    stages: ScoringStages,
    config: PipelineConfig,
}

impl ScoringOrchestrator {
    pub fn new(stages: ScoringStages, config: PipelineConfig) -> Self {
        Self { stages, config }
    }

    /// Whether the configured extractor handles documents of this kind.
    pub fn can_extract(&self, kind: DocumentKind) -> bool {
        self.stages.text_extractor.supports(kind)
    }

    /// Extracts plain text from a stored document.
    pub async fn extract_text(&self, document: &Path) -> Result<String, PipelineError> {
        self.guarded(
            Stage::TextExtraction,
            self.config.stage_timeout,
            self.stages.text_extractor.extract(document),
        )
        .await
    }

    /// Extracts and parses a résumé without scoring it.
    pub async fn prepare_resume(
        &self,
        resume: &ResumeDocument,
    ) -> Result<PreparedResume, PipelineError> {
        let text = self.extract_text(&resume.path).await?;
        let parsed = self.parse_resume(&resume.path).await?;
        Ok(PreparedResume { text, parsed })
    }

    /// Extracts and parses an uploaded job document. The parser reads the
    /// stored document itself, so both run concurrently.
    pub async fn ingest_job(&self, document: &Path) -> Result<PreparedJob, PipelineError> {
        let (text, parsed) = tokio::join!(self.extract_text(document), self.parse_job(document));
        Ok(PreparedJob {
            text: text?,
            parsed: parsed?,
        })
    }

    /// Parses a job whose description was typed in and stored as plain
    /// text at `document`. The text is already known, so nothing is
    /// extracted.
    pub async fn ingest_job_text(
        &self,
        document: &Path,
        text: String,
    ) -> Result<PreparedJob, PipelineError> {
        let parsed = self.parse_job(document).await?;
        Ok(PreparedJob { text, parsed })
    }

    /// Runs the full pipeline for one (résumé, job) pair.
    pub async fn score(
        &self,
        resume: &ResumeDocument,
        job: &JobDocument,
    ) -> Result<ScoringRun, PipelineError> {
        info!(
            "Scoring {} against job {}",
            resume.path.display(),
            job.id
        );

        let resume_text = self.extract_text(&resume.path).await?;

        let job_file = write_job_text(&job.description_text).await?;
        let run = self
            .run_stages(resume, job, resume_text, job_file.path())
            .await;
        discard(job_file);

        let run = run?;
        info!(
            "Scored job {}: final={:.1} overlap={:.1} llm={:.1} degraded={}",
            job.id,
            run.bundle.final_score,
            run.bundle.overlap,
            run.bundle.llm_score,
            run.bundle.degraded
        );
        Ok(run)
    }

    async fn run_stages(
        &self,
        resume: &ResumeDocument,
        job: &JobDocument,
        resume_text: String,
        job_path: &Path,
    ) -> Result<ScoringRun, PipelineError> {
        // Both parsers are independent; when both fail the résumé error wins.
        let (resume_parsed, job_parsed) =
            tokio::join!(self.parse_resume(&resume.path), self.parse_job(job_path));
        let resume_parsed = resume_parsed?;
        let job_parsed = job_parsed?;

        let (overlap, llm) = tokio::join!(
            self.soft(
                Stage::SemanticMatching,
                self.config.stage_timeout,
                self.stages.semantic_matcher.overlap(&resume.path, job_path),
            ),
            self.soft(
                Stage::LlmComparison,
                self.config.llm_timeout,
                self.stages
                    .llm_comparator
                    .compare(&resume_parsed.raw, &job_parsed.raw),
            ),
        );

        let request = BlendRequest {
            resume_text: &resume_text,
            job_text: &job.description_text,
            resume_json: &resume_parsed.raw,
            job_json: &job_parsed.raw,
            overlap: overlap.value(),
            llm_score: llm.value(),
        };
        let blended = self
            .guarded(
                Stage::ScoreBlending,
                self.config.stage_timeout,
                self.stages.score_blender.blend(&request),
            )
            .await?;

        Ok(ScoringRun {
            resume: PreparedResume {
                text: resume_text,
                parsed: resume_parsed,
            },
            job: job_parsed,
            bundle: ScoreBundle::assemble(blended, overlap, llm),
        })
    }

    async fn parse_resume(
        &self,
        document: &Path,
    ) -> Result<ParsedDocument<ParsedResume>, PipelineError> {
        self.guarded(
            Stage::ResumeParsing,
            self.config.stage_timeout,
            self.stages.resume_parser.parse(document),
        )
        .await
    }

    async fn parse_job(&self, document: &Path) -> Result<ParsedDocument<ParsedJob>, PipelineError> {
        self.guarded(
            Stage::JobParsing,
            self.config.stage_timeout,
            self.stages.job_parser.parse(document),
        )
        .await
    }

    /// Runs a stage under a time limit, tagging any failure with the stage.
    async fn guarded<T, F>(&self, stage: Stage, limit: Duration, work: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, StageError>>,
    {
        debug!("Starting {stage}");
        match tokio::time::timeout(limit, work).await {
            Ok(Ok(value)) => {
                debug!("Finished {stage}");
                Ok(value)
            }
            Ok(Err(source)) => Err(PipelineError::Stage { stage, source }),
            Err(_) => Err(PipelineError::Timeout {
                stage,
                after: limit,
            }),
        }
    }

    /// Like `guarded`, but a failure degrades the signal instead of aborting.
    async fn soft<F>(&self, stage: Stage, limit: Duration, work: F) -> AuxSignal
    where
        F: Future<Output = Result<f64, StageError>>,
    {
        debug_assert!(!stage.is_fatal(), "{stage} must not degrade");
        match self.guarded(stage, limit, work).await {
            Ok(value) => AuxSignal::Measured(value),
            Err(e) => {
                warn!("{e}; using 0 for {stage}");
                AuxSignal::Degraded
            }
        }
    }
}

/// Writes the job text to a request-scoped `job-*.txt` file for the
/// path-based stages.
async fn write_job_text(text: &str) -> Result<tempfile::NamedTempFile, PipelineError> {
    let file = tempfile::Builder::new()
        .prefix("job-")
        .suffix(".txt")
        .tempfile()?;
    tokio::fs::write(file.path(), text.as_bytes()).await?;
    Ok(file)
}

fn discard(file: tempfile::NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        warn!("Could not remove temp file {}: {e}", path.display());
    }
}

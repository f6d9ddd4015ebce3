// Scoring pipeline.
// The orchestrator sequences six stages behind async traits. Script-backed
// stages shell out through `ScriptRunner`; the comparator calls the LLM.

pub mod bundle;
pub mod comparator;
pub mod native;
pub mod orchestrator;
pub mod parsed;
pub mod process;
pub mod scripts;
pub mod stages;

use std::sync::Arc;

pub use bundle::{ScoreBundle, Signal};
pub use orchestrator::{
    JobDocument, PipelineConfig, PipelineError, PreparedJob, ResumeDocument, ScoringOrchestrator,
    ScoringStages,
};
pub use stages::{Stage, StageError};

use crate::config::{Config, ExtractorBackend};
use crate::llm_client::LlmClient;
use comparator::OpenAiComparator;
use native::NativeTextExtractor;
use process::ScriptRunner;
use scripts::{
    Script, ScriptJobParser, ScriptResumeParser, ScriptScoreBlender, ScriptSemanticMatcher,
    ScriptTextExtractor,
};
use stages::TextExtractor;

/// Wires the configured stage implementations.
pub fn build_stages(config: &Config, llm: LlmClient) -> ScoringStages {
    let paths = &config.scripts;
    let runner = ScriptRunner::new(&paths.python);
    let script = |path: &std::path::PathBuf| Script::new(runner.clone(), path.clone());

    let text_extractor: Arc<dyn TextExtractor> = match config.extractor_backend {
        ExtractorBackend::Script => Arc::new(ScriptTextExtractor(script(&paths.text_extractor))),
        ExtractorBackend::Native => Arc::new(NativeTextExtractor),
    };

    ScoringStages {
        text_extractor,
        resume_parser: Arc::new(ScriptResumeParser(script(&paths.resume_parser))),
        job_parser: Arc::new(ScriptJobParser(script(&paths.job_parser))),
        semantic_matcher: Arc::new(ScriptSemanticMatcher(script(&paths.semantic_matcher))),
        llm_comparator: Arc::new(OpenAiComparator::new(llm)),
        score_blender: Arc::new(ScriptScoreBlender(script(&paths.score_blender))),
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stage_timeout: config.stage_timeout,
            llm_timeout: config.llm_timeout,
        }
    }
}

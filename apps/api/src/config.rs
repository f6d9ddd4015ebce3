use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Which implementation backs the text extraction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorBackend {
    /// Shell out to the configured extractor script.
    Script,
    /// Extract in-process (PDF and plain text only).
    Native,
}

impl FromStr for ExtractorBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "script" => Ok(Self::Script),
            "native" => Ok(Self::Native),
            other => bail!("Unknown text extractor backend '{other}' (expected 'script' or 'native')"),
        }
    }
}

/// Interpreter and script locations for the external scoring processes.
#[derive(Debug, Clone)]
pub struct ScriptPaths {
    pub python: PathBuf,
    pub text_extractor: PathBuf,
    pub resume_parser: PathBuf,
    pub job_parser: PathBuf,
    pub semantic_matcher: PathBuf,
    pub score_blender: PathBuf,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: String,
    pub llm_api_url: String,
    pub llm_model: String,
    pub upload_dir: PathBuf,
    pub scripts: ScriptPaths,
    pub extractor_backend: ExtractorBackend,
    pub stage_timeout: Duration,
    pub llm_timeout: Duration,
    pub cors_origin: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            llm_api_url: env_or("LLM_API_URL", "https://api.openai.com/v1"),
            llm_model: env_or("LLM_MODEL", "gpt-3.5-turbo"),
            upload_dir: env_or("UPLOAD_DIR", "uploads").into(),
            scripts: ScriptPaths {
                python: env_or("PYTHON_EXECUTABLE", "python3").into(),
                text_extractor: env_or("TEXT_EXTRACTOR_SCRIPT", "scripts/text_extractor.py").into(),
                resume_parser: env_or("RESUME_PARSER_SCRIPT", "scripts/ResumeParser.py").into(),
                job_parser: env_or("JOB_PARSER_SCRIPT", "scripts/JobDescriptionParser.py").into(),
                semantic_matcher: env_or("SEMANTIC_MATCHER_SCRIPT", "scripts/semantic_matcher.py")
                    .into(),
                score_blender: env_or("SCORE_BLENDER_SCRIPT", "scripts/score_resumes.py").into(),
            },
            extractor_backend: env_or("TEXT_EXTRACTOR_BACKEND", "script").parse()?,
            stage_timeout: Duration::from_secs(parse_env("STAGE_TIMEOUT_SECS", 300)?),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 60)?),
            cors_origin: std::env::var("CORS_ORIGIN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

//! Stage implementations backed by the external scripts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::scoring::bundle::{numeric, BlendedScores};
use crate::scoring::parsed::{ParsedDocument, ParsedJob, ParsedResume};
use crate::scoring::process::{ScriptError, ScriptOutput, ScriptRunner};
use crate::scoring::stages::{
    BlendRequest, JobParser, ResumeParser, ScoreBlender, SemanticMatcher, StageError,
    TextExtractor,
};

/// A runner bound to one script.
#[derive(Debug, Clone)]
pub struct Script {
    runner: ScriptRunner,
    path: PathBuf,
}

impl Script {
    pub fn new(runner: ScriptRunner, path: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            path: path.into(),
        }
    }

    async fn result_line(&self, args: &[&Path], stdin: Option<&[u8]>) -> Result<String, StageError> {
        let output: ScriptOutput = self.runner.run(&self.path, args, stdin).await?;
        output
            .result_line()
            .map(str::to_string)
            .ok_or_else(|| {
                StageError::Script(ScriptError::EmptyOutput {
                    script: self.path.display().to_string(),
                })
            })
    }
}

/// Interprets the extractor's result line. A JSON object with a string
/// `text` field yields the full text; any other line is the text itself.
pub fn decode_extracted_text(line: &str) -> String {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(map)) => match map.get("text") {
            Some(Value::String(text)) => text.clone(),
            _ => line.to_string(),
        },
        _ => line.to_string(),
    }
}

pub struct ScriptTextExtractor(pub Script);

#[async_trait]
impl TextExtractor for ScriptTextExtractor {
    async fn extract(&self, document: &Path) -> Result<String, StageError> {
        let line = self.0.result_line(&[document], None).await?;
        Ok(decode_extracted_text(&line))
    }
}

pub struct ScriptResumeParser(pub Script);

#[async_trait]
impl ResumeParser for ScriptResumeParser {
    async fn parse(&self, document: &Path) -> Result<ParsedDocument<ParsedResume>, StageError> {
        let line = self.0.result_line(&[document], None).await?;
        ParsedDocument::from_json_line(&line)
    }
}

pub struct ScriptJobParser(pub Script);

#[async_trait]
impl JobParser for ScriptJobParser {
    async fn parse(&self, document: &Path) -> Result<ParsedDocument<ParsedJob>, StageError> {
        let line = self.0.result_line(&[document], None).await?;
        ParsedDocument::from_json_line(&line)
    }
}

pub struct ScriptSemanticMatcher(pub Script);

#[async_trait]
impl SemanticMatcher for ScriptSemanticMatcher {
    async fn overlap(&self, resume: &Path, job: &Path) -> Result<f64, StageError> {
        let line = self.0.result_line(&[resume, job], None).await?;
        parse_overlap(&line)
    }
}

/// Reads `{"Overlap": <number>}`.
pub fn parse_overlap(line: &str) -> Result<f64, StageError> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| StageError::MalformedOutput(format!("matcher output is not JSON ({e}): {line}")))?;
    value
        .get("Overlap")
        .and_then(numeric)
        .ok_or_else(|| StageError::MalformedOutput(format!("matcher output has no Overlap: {line}")))
}

pub struct ScriptScoreBlender(pub Script);

#[async_trait]
impl ScoreBlender for ScriptScoreBlender {
    async fn blend(&self, request: &BlendRequest<'_>) -> Result<BlendedScores, StageError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| StageError::MalformedOutput(format!("could not encode blender input: {e}")))?;
        let line = self.0.result_line(&[], Some(&payload)).await?;
        let output: Value = serde_json::from_str(&line).map_err(|e| {
            StageError::MalformedOutput(format!("blender output is not JSON ({e}): {line}"))
        })?;
        BlendedScores::from_output(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> Script {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{body}").unwrap();
        Script::new(ScriptRunner::new("sh"), path)
    }

    #[test]
    fn test_decode_json_framed_text_keeps_all_lines() {
        let line = r#"{"text": "Jane Doe\nSenior Engineer\nRust, SQL"}"#;
        assert_eq!(
            decode_extracted_text(line),
            "Jane Doe\nSenior Engineer\nRust, SQL"
        );
    }

    #[test]
    fn test_decode_plain_line_is_taken_verbatim() {
        assert_eq!(
            decode_extracted_text("Experienced engineer..."),
            "Experienced engineer..."
        );
        assert_eq!(decode_extracted_text(r#"{"body": "x"}"#), r#"{"body": "x"}"#);
    }

    #[test]
    fn test_parse_overlap_variants() {
        assert_eq!(parse_overlap(r#"{"Overlap": 72.5}"#).unwrap(), 72.5);
        assert_eq!(parse_overlap(r#"{"Overlap": "40"}"#).unwrap(), 40.0);
        assert!(parse_overlap(r#"{"Match Score": 0.0, "error": "bad pdf"}"#).is_err());
        assert!(parse_overlap("Usage: python semantic_matcher.py").is_err());
    }

    #[tokio::test]
    async fn test_script_extractor_reads_json_framing() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = ScriptTextExtractor(script(
            &dir,
            "extract.sh",
            r#"echo 'pdfplumber warming up'
printf '%s\n' '{"text": "line one\nline two"}'"#,
        ));

        let text = extractor.extract(Path::new("/tmp/r1.pdf")).await.unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[tokio::test]
    async fn test_script_matcher_reports_failure_exit() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = ScriptSemanticMatcher(script(
            &dir,
            "match.sh",
            r#"echo '{"Match Score": 0.0, "error": "Unsupported file type"}'
exit 1"#,
        ));

        let err = matcher
            .overlap(Path::new("/tmp/r1.png"), Path::new("/tmp/j1.txt"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StageError::Script(ScriptError::NonZeroExit { code: Some(1), .. })
        ));
    }

    #[tokio::test]
    async fn test_script_blender_receives_payload_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        // Echoes the FinalScore back only when the payload carried the LLM score.
        let blender = ScriptScoreBlender(script(
            &dir,
            "blend.sh",
            r#"payload=$(cat)
case "$payload" in
  *'"LLMscore":81.0'*) echo '{"FinalScore":78.0,"SemanticScore":80,"SkillsScore":90,"EducationScore":70,"ExperienceScore":75}' ;;
  *) echo '{"error":"payload missing LLMscore"}' ;;
esac"#,
        ));

        let resume_json = json!({"skills": "Java,SQL"});
        let job_json = json!({"skills": ["Java"]});
        let request = BlendRequest {
            resume_text: "Experienced engineer...",
            job_text: "Java developer",
            resume_json: &resume_json,
            job_json: &job_json,
            overlap: 72.5,
            llm_score: 81.0,
        };

        let scores = blender.blend(&request).await.unwrap();
        assert_eq!(scores.final_score, 78.0);
        assert_eq!(scores.skills_score, 90.0);
    }

    #[tokio::test]
    async fn test_script_resume_parser_rejects_non_json() {
        let dir = tempfile::tempdir().unwrap();
        let parser = ScriptResumeParser(script(&dir, "parse.sh", "echo 'N/A'"));

        let err = parser.parse(Path::new("/tmp/r1.pdf")).await.unwrap_err();
        assert!(matches!(err, StageError::MalformedOutput(_)));
    }
}

// Prompt templates for the LLM comparator stage.

/// Asks for one bare compatibility number. `{resume_json}` and `{job_json}`
/// are replaced with the parser outputs.
pub const COMPATIBILITY_PROMPT: &str = r#"Give ONE number from 0 to 100 (higher = better) that reflects
how well this résumé matches this job description, focusing on
skills, education, and years of experience.

Return ONLY the number, nothing else.

RESUME_JSON:
{resume_json}

JOB_JSON:
{job_json}
"#;

/// Builds the comparator prompt from the two parsed documents.
pub fn compatibility_prompt(resume_json: &str, job_json: &str) -> String {
    COMPATIBILITY_PROMPT
        .replace("{resume_json}", resume_json)
        .replace("{job_json}", job_json)
}

//! Structured parser outputs.
//!
//! Both parsers emit one JSON object. The typed view is used for
//! persistence; the raw object is what downstream stages receive, untouched.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scoring::stages::StageError;

/// Fields the résumé parser reports. Missing fields deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Comma-separated string or array in the parser output.
    #[serde(default, deserialize_with = "string_list")]
    pub skills: Vec<String>,
    #[serde(default)]
    pub work_experience: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
}

/// Fields the job parser reports, under the parser's own key names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedJob {
    #[serde(rename = "Job Category", default)]
    pub category: Option<String>,
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
    #[serde(rename = "Job Description", default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub skills: Vec<String>,
    #[serde(rename = "Requirements", default, deserialize_with = "string_list")]
    pub requirements: Vec<String>,
    #[serde(rename = "Responsibilities", default, deserialize_with = "string_list")]
    pub responsibilities: Vec<String>,
}

/// A parser result: typed fields plus the raw JSON object they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument<T> {
    pub fields: T,
    pub raw: Value,
}

impl<T: DeserializeOwned> ParsedDocument<T> {
    /// Interprets one output line as a JSON object.
    pub fn from_json_line(line: &str) -> Result<Self, StageError> {
        let raw: Value = serde_json::from_str(line)
            .map_err(|e| StageError::MalformedOutput(format!("not JSON ({e}): {line}")))?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: Value) -> Result<Self, StageError> {
        if !raw.is_object() {
            return Err(StageError::MalformedOutput(format!(
                "expected a JSON object, got {raw}"
            )));
        }
        let fields = serde_json::from_value(raw.clone())
            .map_err(|e| StageError::MalformedOutput(format!("unexpected field types: {e}")))?;
        Ok(Self { fields, raw })
    }
}

/// Turns a JSON array or a comma-separated string into trimmed, non-blank items.
pub fn string_list_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(string_list_from_value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resume_skills_from_csv_string() {
        let doc = ParsedDocument::<ParsedResume>::from_json_line(
            r#"{"email":"a@b.co","skills":"Java, SQL ,,  ","education":"BSc CS"}"#,
        )
        .unwrap();
        assert_eq!(doc.fields.skills, vec!["Java", "SQL"]);
        assert_eq!(doc.fields.education.as_deref(), Some("BSc CS"));
        assert_eq!(doc.fields.phone_number, None);
        assert_eq!(doc.raw["skills"], json!("Java, SQL ,,  "));
    }

    #[test]
    fn test_job_fields_use_parser_key_names() {
        let doc = ParsedDocument::<ParsedJob>::from_json_line(
            r#"{"Job Category":"Engineer","Location":"Austin, TX","Job Description":"Build APIs.",
                "skills":["Java"," Spring "],"Requirements":["5 years"],"Responsibilities":"Ship, Review"}"#,
        )
        .unwrap();
        assert_eq!(doc.fields.category.as_deref(), Some("Engineer"));
        assert_eq!(doc.fields.location.as_deref(), Some("Austin, TX"));
        assert_eq!(doc.fields.summary.as_deref(), Some("Build APIs."));
        assert_eq!(doc.fields.skills, vec!["Java", "Spring"]);
        assert_eq!(doc.fields.requirements, vec!["5 years"]);
        assert_eq!(doc.fields.responsibilities, vec!["Ship", "Review"]);
    }

    #[test]
    fn test_null_list_is_empty() {
        let doc = ParsedDocument::<ParsedJob>::from_json_line(r#"{"skills":null}"#).unwrap();
        assert!(doc.fields.skills.is_empty());
    }

    #[test]
    fn test_non_object_output_is_malformed() {
        assert!(matches!(
            ParsedDocument::<ParsedResume>::from_json_line("[1,2,3]"),
            Err(StageError::MalformedOutput(_))
        ));
        assert!(matches!(
            ParsedDocument::<ParsedResume>::from_json_line("Traceback (most recent call last):"),
            Err(StageError::MalformedOutput(_))
        ));
    }
}

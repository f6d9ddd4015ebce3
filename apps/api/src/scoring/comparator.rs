use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::llm_client::prompts::compatibility_prompt;
use crate::llm_client::{CompletionParams, LlmClient};
use crate::scoring::bundle::clamp_score;
use crate::scoring::stages::{LlmComparator, StageError};

/// Short, near-deterministic replies: the prompt asks for a bare number.
const COMPARISON_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.2,
    max_tokens: 4,
};

/// Asks a chat-completion model for a 0-100 compatibility number.
pub struct OpenAiComparator {
    llm: LlmClient,
}

impl OpenAiComparator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl LlmComparator for OpenAiComparator {
    async fn compare(&self, resume_json: &Value, job_json: &Value) -> Result<f64, StageError> {
        let prompt = compatibility_prompt(&resume_json.to_string(), &job_json.to_string());
        let score = self.llm.call_number(&prompt, COMPARISON_PARAMS).await?;
        debug!("{} rated compatibility {score}", self.llm.model());
        Ok(clamp_score(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn comparator_for(server: &MockServer) -> OpenAiComparator {
        let llm = LlmClient::new(
            "test-key".to_string(),
            &server.base_url(),
            "gpt-3.5-turbo".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        OpenAiComparator::new(llm)
    }

    #[tokio::test]
    async fn test_prompt_carries_both_parsed_documents() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .body_contains(r#"{\"skills\":\"Java,SQL\"}"#)
                    .body_contains(r#"{\"skills\":[\"Java\"]}"#)
                    .json_body_partial(r#"{"temperature": 0.2, "max_tokens": 4}"#);
                then.status(200).json_body(json!({
                    "choices": [{"message": {"content": "81"}}]
                }));
            })
            .await;

        let score = comparator_for(&server)
            .compare(&json!({"skills": "Java,SQL"}), &json!({"skills": ["Java"]}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(score, 81.0);
    }

    #[tokio::test]
    async fn test_out_of_range_reply_is_clamped() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{"message": {"content": "250"}}]
                }));
            })
            .await;

        let score = comparator_for(&server)
            .compare(&json!({}), &json!({}))
            .await
            .unwrap();
        assert_eq!(score, 100.0);
    }

    #[tokio::test]
    async fn test_refusal_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{"message": {"content": "N/A"}}]
                }));
            })
            .await;

        let err = comparator_for(&server)
            .compare(&json!({}), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Llm(_)));
    }
}

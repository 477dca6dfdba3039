use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::prompt::SCHEMA_NAME;
use crate::config::LlmConfig;

/// A language model that answers a prompt with text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Asks for an answer constrained to `schema`.
    async fn structured(&self, prompt: &str, schema: &Value) -> Result<String, CompletionError>;

    /// Plain chat completion, used when the structured call fails.
    async fn chat(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

/// OpenAI HTTP client: the Responses API for structured output and chat
/// completions with a cheaper model as the fallback.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    fallback_model: String,
}

impl OpenAiClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        fallback_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            fallback_model: fallback_model.into(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::new(
            client,
            config.base_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.fallback_model.clone(),
        ))
    }

    fn post(&self, path: &str, body: &Value) -> Result<RequestBuilder, CompletionError> {
        let key = self.api_key.as_deref().ok_or(CompletionError::MissingApiKey)?;
        Ok(self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(key)
            .json(body))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn structured(&self, prompt: &str, schema: &Value) -> Result<String, CompletionError> {
        let body = json!({
            "model": self.model,
            "input": prompt,
            "temperature": 0,
            "text": {
                "format": {
                    "type": "json_schema",
                    "name": SCHEMA_NAME,
                    "schema": schema,
                    "strict": true
                }
            }
        });
        let payload = send(self.post("responses", &body)?).await?;
        response_output_text(&payload)
    }

    async fn chat(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = json!({
            "model": self.fallback_model,
            "messages": [{ "role": "user", "content": prompt }]
        });
        let payload = send(self.post("chat/completions", &body)?).await?;
        chat_message_content(&payload)
    }
}

async fn send(request: RequestBuilder) -> Result<Value, CompletionError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CompletionError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<Value>().await?)
}

/// Concatenates every `output_text` part of a Responses API payload.
fn response_output_text(payload: &Value) -> Result<String, CompletionError> {
    if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
        return Ok(text.to_string());
    }

    let output = payload
        .get("output")
        .and_then(Value::as_array)
        .ok_or_else(|| CompletionError::Malformed("missing output".to_string()))?;

    Ok(output
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect())
}

fn chat_message_content(payload: &Value) -> Result<String, CompletionError> {
    let message = payload
        .pointer("/choices/0/message")
        .ok_or_else(|| CompletionError::Malformed("missing choices[0].message".to_string()))?;
    Ok(message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_payload_joins_output_text_parts() {
        let payload = json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "message", "content": [
                    { "type": "output_text", "text": "{\"추천 지역\":" },
                    { "type": "output_text", "text": "[]}" },
                    { "type": "refusal", "refusal": "no" }
                ]}
            ]
        });
        assert_eq!(
            response_output_text(&payload).expect("text"),
            "{\"추천 지역\":[]}"
        );
        assert!(response_output_text(&json!({})).is_err());
    }

    #[test]
    fn chat_payload_reads_first_choice_and_tolerates_null_content() {
        let payload = json!({ "choices": [{ "message": { "content": "hi" } }] });
        assert_eq!(chat_message_content(&payload).expect("text"), "hi");

        let empty = json!({ "choices": [{ "message": { "content": null } }] });
        assert_eq!(chat_message_content(&empty).expect("text"), "");
        assert!(chat_message_content(&json!({ "choices": [] })).is_err());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = OpenAiClient::new(
            Client::new(),
            "http://127.0.0.1:9",
            Some("  ".to_string()),
            "gpt-5-mini",
            "gpt-5-nano",
        );
        let error = client.chat("hello").await.expect_err("no key");
        assert!(matches!(error, CompletionError::MissingApiKey));
    }
}

//! LLM-backed recommendation of the week's notices for one applicant.

pub mod client;
pub mod composer;
pub mod prompt;
pub mod response;

use serde::Serialize;

pub use client::{CompletionClient, CompletionError, OpenAiClient};
pub use composer::StrategyComposer;
pub use prompt::{build_prompt, normalize, recommendation_schema, PromptNotice};
pub use response::{parse_recommendation, strip_fences, Recommendation, RecommendedNotice};

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("OpenAI 호출 실패: {0}")]
    Completion(#[source] CompletionError),
    #[error("빈 응답")]
    EmptyResponse,
    #[error("JSON 파싱 실패")]
    Parse { raw: String },
}

impl StrategyError {
    /// Model output that could not be parsed, when there was any.
    pub fn raw(&self) -> Option<&str> {
        match self {
            StrategyError::Parse { raw } => Some(raw),
            _ => None,
        }
    }
}

/// Error body returned to strategy callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl From<&StrategyError> for StrategyFailure {
    fn from(error: &StrategyError) -> Self {
        Self {
            error: error.to_string(),
            raw: error.raw().map(str::to_string),
        }
    }
}

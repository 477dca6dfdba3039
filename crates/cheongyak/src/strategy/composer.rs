use tracing::{info, warn};

use super::client::CompletionClient;
use super::prompt::{build_prompt, recommendation_schema};
use super::response::{parse_recommendation, Recommendation};
use super::StrategyError;
use crate::notices::{Notice, UserProfile, WeekRange};

/// Turns a profile and a week of notices into a ranked recommendation.
pub struct StrategyComposer<C> {
    client: C,
}

impl<C: CompletionClient> StrategyComposer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn compose(
        &self,
        profile: &UserProfile,
        week: &WeekRange,
        notices: &[Notice],
    ) -> Result<Recommendation, StrategyError> {
        let prompt = build_prompt(profile, week, notices);
        let text = self.complete(&prompt).await?;
        if text.trim().is_empty() {
            return Err(StrategyError::EmptyResponse);
        }

        let recommendation = parse_recommendation(&text)?;
        info!(
            notices = notices.len(),
            recommended = recommendation.notices.len(),
            "composed recommendation"
        );
        Ok(recommendation)
    }

    /// One structured call, then at most one chat fallback.
    async fn complete(&self, prompt: &str) -> Result<String, StrategyError> {
        match self.client.structured(prompt, &recommendation_schema()).await {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!(error = %err, "structured completion failed; falling back to chat");
                self.client
                    .chat(prompt)
                    .await
                    .map_err(StrategyError::Completion)
            }
        }
    }
}

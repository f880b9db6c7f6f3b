// Trait seams for the LLM dependency.
//
// LanguageModel covers both the relevance check and the final ranking call;
// TokenCounter sizes the ranking prompt before it is sent. Both are
// implemented for ai_client::Claude here and by MockModel in testing.rs.

use ai_client::{Agent, Claude, PromptBuilder};
use async_trait::async_trait;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a single user-turn prompt and return the raw text response.
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> ai_client::Result<String>;
}

#[async_trait]
pub trait TokenCounter: Send + Sync {
    async fn count_tokens(&self, text: &str) -> ai_client::Result<u64>;
}

#[async_trait]
impl LanguageModel for Claude {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> ai_client::Result<String> {
        self.prompt(prompt)
            .max_tokens(max_tokens)
            .temperature(temperature)
            .send()
            .await
    }
}

#[async_trait]
impl TokenCounter for Claude {
    async fn count_tokens(&self, text: &str) -> ai_client::Result<u64> {
        Claude::count_tokens(self, text).await
    }
}

use async_trait::async_trait;

use crate::error::Result;

// =============================================================================
// Agent Trait
// =============================================================================

pub trait Agent: Clone + Send + Sync {
    type PromptBuilder: PromptBuilder;

    fn prompt(&self, input: impl Into<String>) -> Self::PromptBuilder;
}

// =============================================================================
// PromptBuilder Trait
// =============================================================================

#[async_trait]
pub trait PromptBuilder: Send + Sized {
    fn temperature(self, temperature: f32) -> Self;
    fn max_tokens(self, max_tokens: u32) -> Self;
    async fn send(self) -> Result<String>;
}

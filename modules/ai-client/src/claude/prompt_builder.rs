use async_trait::async_trait;
use tracing::debug;

use crate::error::{AiError, Result};
use crate::traits::PromptBuilder;

use super::types::*;
use super::Claude;

/// One user turn plus sampling settings.
pub struct ClaudePromptBuilder {
    agent: Claude,
    input: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ClaudePromptBuilder {
    pub(crate) fn new(agent: Claude, input: String) -> Self {
        Self {
            agent,
            input,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[async_trait]
impl PromptBuilder for ClaudePromptBuilder {
    fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    async fn send(self) -> Result<String> {
        let client = self.agent.client();

        let mut request = ChatRequest::new(&self.agent.model, self.input);

        if let Some(temp) = self.temperature {
            request = request.temperature(temp);
        }

        if let Some(max_tokens) = self.max_tokens {
            request = request.max_tokens(max_tokens);
        }

        debug!(
            prompt_chars = request.messages[0].content.len(),
            max_tokens = request.max_tokens,
            temperature = ?request.temperature,
            "Sending Claude prompt"
        );

        let response = client.chat(&request).await?;

        response
            .text()
            .ok_or_else(|| AiError::EmptyResponse("no text block in Claude response".into()))
    }
}

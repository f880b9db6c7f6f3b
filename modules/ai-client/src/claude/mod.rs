mod client;
pub mod prompt_builder;
pub(crate) mod types;

pub use prompt_builder::ClaudePromptBuilder;

use crate::error::Result;
use crate::traits::Agent;

use client::ClaudeClient;
use types::*;

// =============================================================================
// Claude Agent
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    // =========================================================================
    // Token counting
    // =========================================================================

    /// Count the input tokens a single user message would consume.
    pub async fn count_tokens(&self, prompt: &str) -> Result<u64> {
        let request = CountTokensRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::user(prompt)],
        };

        let response = self.client().count_tokens(&request).await?;
        Ok(response.input_tokens)
    }
}

// =============================================================================
// Agent Implementation
// =============================================================================

impl Agent for Claude {
    type PromptBuilder = ClaudePromptBuilder;

    fn prompt(&self, input: impl Into<String>) -> ClaudePromptBuilder {
        ClaudePromptBuilder::new(self.clone(), input.into())
    }
}

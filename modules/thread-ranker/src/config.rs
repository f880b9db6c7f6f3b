use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::error::{RankerError, Result};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub anthropic_api_key: String,
    pub model: String,

    // Search (only needed when a query is given)
    pub google_search_api_key: Option<String>,
    pub google_search_cse_id: Option<String>,

    // Browser automation
    pub webdriver_url: String,

    // Output
    pub output_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY")?,
            model: env::var("CLAUDE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            google_search_api_key: optional_env("GOOGLE_SEARCH_API_KEY"),
            google_search_cse_id: optional_env("GOOGLE_SEARCH_CSE_ID"),
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string()),
            output_dir: env::var("PROMPT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
        })
    }

    /// Search API key and engine id, or a config error naming what is missing.
    pub fn search_credentials(&self) -> Result<(&str, &str)> {
        let key = self.google_search_api_key.as_deref().ok_or_else(|| {
            RankerError::Config("GOOGLE_SEARCH_API_KEY is required for --search-query".into())
        })?;
        let cse_id = self.google_search_cse_id.as_deref().ok_or_else(|| {
            RankerError::Config("GOOGLE_SEARCH_CSE_ID is required for --search-query".into())
        })?;
        Ok((key, cse_id))
    }

    pub fn log_redacted(&self) {
        info!(
            model = %self.model,
            anthropic_api_key = %redact(&self.anthropic_api_key),
            google_search_api_key = %self.google_search_api_key.as_deref().map(redact).unwrap_or_else(|| "(unset)".into()),
            google_search_cse_id = %self.google_search_cse_id.as_deref().unwrap_or("(unset)"),
            webdriver_url = %self.webdriver_url,
            output_dir = %self.output_dir.display(),
            "Loaded configuration"
        );
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| RankerError::Config(format!("{key} environment variable is required")))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Keep the first four characters of a secret.
fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}

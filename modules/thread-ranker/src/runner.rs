use std::path::{Path, PathBuf};

use ai_client::truncate_to_char_boundary;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::traits::{LanguageModel, TokenCounter};

/// Context window of the ranking model. Larger prompts are still sent.
pub const TOKEN_LIMIT: u64 = 200_000;
pub const RANKING_MAX_TOKENS: u32 = 1000;

/// Where the ranking prompt comes from.
pub enum RunRequest<'a> {
    /// Send a previously saved prompt verbatim.
    Cached(PathBuf),
    /// Build the prompt by running the pipeline.
    Pipeline {
        pipeline: &'a Pipeline<'a>,
        query: Option<String>,
        extra_urls: Vec<String>,
        desired_search_count: usize,
    },
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub prompt: String,
    /// Set when a new prompt was written to disk.
    pub prompt_path: Option<PathBuf>,
    /// `None` when counting failed.
    pub token_count: Option<u64>,
    pub over_limit: bool,
    pub response: String,
}

/// Produces the ranking prompt and submits it.
pub struct Runner<'a> {
    model: &'a dyn LanguageModel,
    counter: &'a dyn TokenCounter,
    output_dir: PathBuf,
}

impl<'a> Runner<'a> {
    pub fn new(
        model: &'a dyn LanguageModel,
        counter: &'a dyn TokenCounter,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model,
            counter,
            output_dir: output_dir.into(),
        }
    }

    pub async fn run(&self, request: RunRequest<'_>) -> Result<RunOutcome> {
        let (prompt, prompt_path) = match request {
            RunRequest::Cached(path) => {
                info!(path = %path.display(), "Using cached prompt");
                (tokio::fs::read_to_string(&path).await?, None)
            }
            RunRequest::Pipeline {
                pipeline,
                query,
                extra_urls,
                desired_search_count,
            } => {
                let run = pipeline
                    .run_with_stats(query.as_deref(), &extra_urls, desired_search_count)
                    .await?;
                info!("{}", run.stats);
                let path = self.save_prompt(&run.prompt).await?;
                (run.prompt, Some(path))
            }
        };

        let token_count = match self.counter.count_tokens(&prompt).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(error = %e, "Could not count prompt tokens");
                None
            }
        };
        let over_limit = token_count.is_some_and(|count| count > TOKEN_LIMIT);
        if over_limit {
            warn!(token_count, limit = TOKEN_LIMIT, "Prompt is over the token limit");
        }

        let response = self
            .model
            .complete(&prompt, RANKING_MAX_TOKENS, 0.0)
            .await?;
        debug!(
            response = truncate_to_char_boundary(&response, 200),
            "Ranking response"
        );

        Ok(RunOutcome {
            prompt,
            prompt_path,
            token_count,
            over_limit,
            response,
        })
    }

    async fn save_prompt(&self, prompt: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = prompt_path(&self.output_dir, chrono::Local::now());
        tokio::fs::write(&path, prompt).await?;
        info!(path = %path.display(), "Saved prompt");
        Ok(path)
    }
}

/// `prompt_YYYYMMDD_HHMMSS.txt` inside `dir`.
pub fn prompt_path<Tz>(dir: &Path, at: chrono::DateTime<Tz>) -> PathBuf
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    dir.join(format!("prompt_{}.txt", at.format("%Y%m%d_%H%M%S")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn prompt_file_name_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2024, 9, 5, 7, 3, 9).unwrap();
        let path = prompt_path(Path::new("/tmp/out"), at);
        assert_eq!(path, PathBuf::from("/tmp/out/prompt_20240905_070309.txt"));
    }
}

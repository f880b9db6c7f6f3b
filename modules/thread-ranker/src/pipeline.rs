use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::classifier::RelevanceClassifier;
use crate::comments::CommentScraper;
use crate::delay::{self, DelayStrategy, NoDelay};
use crate::error::{RankerError, Result};
use crate::extractor::ThreadExtractor;
use crate::report::{format_comments, ranking_prompt, thread_block};
use crate::search::WebSearcher;
use crate::types::Comment;

/// Only URLs containing this are considered threads.
pub const THREAD_HOST_MARKER: &str = "reddit.com";

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub urls_found: usize,
    pub skipped: usize,
    pub classified: usize,
    pub relevant: usize,
    pub comments: usize,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run stats:")?;
        writeln!(f, "  URLs found:       {}", self.urls_found)?;
        writeln!(f, "  Skipped:          {}", self.skipped)?;
        writeln!(f, "  Classified:       {}", self.classified)?;
        writeln!(f, "  Relevant threads: {}", self.relevant)?;
        write!(f, "  Comments scraped: {}", self.comments)
    }
}

/// Ranking prompt plus the counters that produced it.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub prompt: String,
    pub stats: RunStats,
}

/// Search, filter, scrape and report, one thread at a time.
pub struct Pipeline<'a> {
    searcher: Option<&'a dyn WebSearcher>,
    extractor: &'a dyn ThreadExtractor,
    classifier: RelevanceClassifier<'a>,
    scraper: &'a dyn CommentScraper,
    delay: Arc<dyn DelayStrategy>,
    include_replies: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        extractor: &'a dyn ThreadExtractor,
        classifier: RelevanceClassifier<'a>,
        scraper: &'a dyn CommentScraper,
    ) -> Self {
        Self {
            searcher: None,
            extractor,
            classifier,
            scraper,
            delay: Arc::new(NoDelay),
            include_replies: true,
        }
    }

    /// Required when a query is passed to `run`.
    pub fn with_searcher(mut self, searcher: &'a dyn WebSearcher) -> Self {
        self.searcher = Some(searcher);
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn DelayStrategy>) -> Self {
        self.delay = delay;
        self
    }

    pub fn include_replies(mut self, include: bool) -> Self {
        self.include_replies = include;
        self
    }

    pub async fn run(
        &self,
        query: Option<&str>,
        extra_urls: &[String],
        desired_search_count: usize,
    ) -> Result<String> {
        Ok(self
            .run_with_stats(query, extra_urls, desired_search_count)
            .await?
            .prompt)
    }

    pub async fn run_with_stats(
        &self,
        query: Option<&str>,
        extra_urls: &[String],
        desired_search_count: usize,
    ) -> Result<PipelineRun> {
        let mut urls: Vec<String> = match query {
            Some(q) => {
                let searcher = self.searcher.ok_or_else(|| {
                    RankerError::Config("a search query needs a configured searcher".into())
                })?;
                searcher
                    .search(q, desired_search_count)
                    .await?
                    .into_iter()
                    .map(|r| r.url)
                    .collect()
            }
            None => Vec::new(),
        };
        urls.extend(extra_urls.iter().cloned());

        let mut stats = RunStats {
            urls_found: urls.len(),
            ..RunStats::default()
        };
        info!(count = urls.len(), query = query.unwrap_or(""), "Collected candidate URLs");
        for (index, url) in urls.iter().enumerate() {
            info!(index, url = %url, "Candidate URL");
        }

        let mut blocks: Vec<String> = Vec::new();

        for (index, url) in urls.iter().enumerate() {
            if !url.contains(THREAD_HOST_MARKER) {
                debug!(index, url = %url, "Skipping non-thread URL");
                stats.skipped += 1;
                continue;
            }

            let document = self.extractor.extract(url).await;
            let verdict = self.classifier.classify(query, &document).await?;
            stats.classified += 1;
            info!(
                index,
                url = %url,
                title = document.title_or_placeholder(),
                verdict = %verdict,
                "Relevance decision"
            );

            if !verdict.is_yes() {
                continue;
            }

            let comments = self.scraper.scrape(url).await?;
            stats.relevant += 1;
            stats.comments += comments.iter().map(Comment::subtree_len).sum::<usize>();

            let formatted = format_comments(&comments, 1, self.include_replies);
            blocks.push(thread_block(index, &formatted));

            self.delay.pause(delay::BETWEEN_THREADS).await;
        }

        info!(
            urls_found = stats.urls_found,
            skipped = stats.skipped,
            classified = stats.classified,
            relevant = stats.relevant,
            comments = stats.comments,
            "Pipeline finished"
        );

        let report = blocks.concat();
        Ok(PipelineRun {
            prompt: ranking_prompt(query, &report),
            stats,
        })
    }
}

pub mod browser;
pub mod classifier;
pub mod comments;
pub mod config;
pub mod delay;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod runner;
pub mod search;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use browser::{BrowserError, BrowserLauncher, BrowserSession, ElementRef, WebDriverLauncher};
pub use classifier::RelevanceClassifier;
pub use comments::{CommentScraper, CommentTreeScraper, ScrapeSettings};
pub use config::Config;
pub use delay::{DelayStrategy, NoDelay, RandomDelay};
pub use error::{RankerError, Result};
pub use extractor::{HttpThreadExtractor, ThreadExtractor};
pub use pipeline::{Pipeline, PipelineRun, RunStats};
pub use render::render_markdown;
pub use runner::{RunOutcome, RunRequest, Runner, TOKEN_LIMIT};
pub use search::{GoogleSearcher, WebSearcher};
pub use traits::{LanguageModel, TokenCounter};
pub use types::{Comment, RelevanceVerdict, SearchResult, ThreadDocument};

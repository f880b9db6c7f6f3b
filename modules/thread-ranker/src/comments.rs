use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::browser::{wait_for_any, BrowserError, BrowserLauncher, BrowserSession, ElementRef};
use crate::delay::{self, DelayStrategy};
use crate::error::{RankerError, Result};
use crate::types::Comment;

/// "More replies" controls. Matched on the exact class list.
pub const LOAD_MORE_SELECTOR: &str = "button[class='text-tone-2 text-12 no-underline hover:underline px-xs py-xs flex ml-[3px] xs:ml-0 !bg-transparent !border-0']";
pub const COMMENT_TREE_SELECTOR: &str = "shreddit-comment-tree";
pub const ROOT_COMMENT_SELECTOR: &str = "shreddit-comment[depth='0']";
pub const COMMENT_TEXT_SELECTOR: &str = "div[slot='comment']";
/// Direct child replies only; deeper replies are reached by recursion.
pub const REPLY_SELECTOR: &str = ":scope > shreddit-comment[slot^='children-']";
pub const SCORE_ATTRIBUTE: &str = "score";

/// Bounds for the browser state machine.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Ceiling for each wait on page elements.
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    /// Stop expanding after this many rounds even if controls keep appearing.
    pub max_expand_rounds: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            max_expand_rounds: 100,
        }
    }
}

// --- CommentScraper trait ---

#[async_trait]
pub trait CommentScraper: Send + Sync {
    /// Root comments of a thread in page order, each with its reply subtree.
    async fn scrape(&self, url: &str) -> Result<Vec<Comment>>;
}

// --- Browser-driven scraper ---

pub struct CommentTreeScraper {
    launcher: Arc<dyn BrowserLauncher>,
    delay: Arc<dyn DelayStrategy>,
    settings: ScrapeSettings,
}

impl CommentTreeScraper {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, delay: Arc<dyn DelayStrategy>) -> Self {
        Self {
            launcher,
            delay,
            settings: ScrapeSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ScrapeSettings) -> Self {
        self.settings = settings;
        self
    }

    async fn scrape_in(&self, session: &dyn BrowserSession, url: &str) -> Vec<Comment> {
        if let Err(e) = session.navigate(url).await {
            warn!(url, error = %e, "Failed to load thread");
            return Vec::new();
        }

        let clicks = self.expand_replies(session).await;
        debug!(url, clicks, "Finished expanding replies");

        if let Err(e) = wait_for_any(
            session,
            COMMENT_TREE_SELECTOR,
            self.settings.wait_timeout,
            self.settings.poll_interval,
        )
        .await
        {
            let err = RankerError::from(e);
            warn!(url, error = %err, "Failed to load the comment tree");
            return Vec::new();
        }

        self.delay.pause(delay::SETTLE).await;

        let roots = match session.find_all(None, ROOT_COMMENT_SELECTOR).await {
            Ok(roots) => roots,
            Err(e) => {
                warn!(url, error = %e, "Failed to list top-level comments");
                return Vec::new();
            }
        };

        let mut comments = Vec::with_capacity(roots.len());
        for root in &roots {
            comments.push(extract_comment(session, root).await);
        }
        comments
    }

    /// Click every "more replies" control until none remain. Returns the
    /// number of controls clicked.
    async fn expand_replies(&self, session: &dyn BrowserSession) -> usize {
        let mut clicks = 0;

        for round in 0..self.settings.max_expand_rounds {
            let buttons = match wait_for_any(
                session,
                LOAD_MORE_SELECTOR,
                self.settings.wait_timeout,
                self.settings.poll_interval,
            )
            .await
            {
                Ok(buttons) => buttons,
                Err(BrowserError::Timeout(_)) | Err(BrowserError::NoSuchElement(_)) => {
                    debug!(round, "No more 'load more replies' controls");
                    return clicks;
                }
                Err(e) => {
                    warn!(round, error = %e, "Error while looking for reply controls");
                    return clicks;
                }
            };

            for button in &buttons {
                if let Err(e) = self.click_control(session, button).await {
                    warn!(round, error = %e, "Error while clicking reply control");
                    return clicks;
                }
                clicks += 1;
            }
        }

        warn!(
            rounds = self.settings.max_expand_rounds,
            "Reply expansion hit the round ceiling"
        );
        clicks
    }

    async fn click_control(
        &self,
        session: &dyn BrowserSession,
        button: &ElementRef,
    ) -> std::result::Result<(), BrowserError> {
        session.scroll_into_view(button).await?;
        self.delay.pause(delay::BEFORE_CLICK).await;

        match session.click(button).await {
            Ok(()) => {}
            Err(BrowserError::ClickIntercepted(_)) => {
                debug!(element = %button.0, "Click intercepted, clicking through script");
                session.script_click(button).await?;
            }
            Err(e) => return Err(e),
        }

        self.delay.pause(delay::AFTER_CLICK).await;
        Ok(())
    }
}

#[async_trait]
impl CommentScraper for CommentTreeScraper {
    async fn scrape(&self, url: &str) -> Result<Vec<Comment>> {
        self.delay.pause(delay::BEFORE_LOAD).await;

        let session = self.launcher.launch().await?;
        let comments = self.scrape_in(session.as_ref(), url).await;

        if let Err(e) = session.quit().await {
            warn!(url, error = %e, "Failed to release browser session");
        }

        info!(
            url,
            roots = comments.len(),
            total = comments.iter().map(Comment::subtree_len).sum::<usize>(),
            "Scraped comment tree"
        );
        Ok(comments)
    }
}

/// Build one comment and its replies. Missing structure yields empty values.
fn extract_comment<'a>(
    session: &'a dyn BrowserSession,
    element: &'a ElementRef,
) -> Pin<Box<dyn Future<Output = Comment> + Send + 'a>> {
    Box::pin(async move {
        let (text, score) = match read_text_and_score(session, element).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(element = %element.0, error = %e, "Comment body missing");
                (String::new(), 0)
            }
        };

        let replies = match session.find_all(Some(element), REPLY_SELECTOR).await {
            Ok(replies) => replies,
            Err(e) => {
                debug!(element = %element.0, error = %e, "No replies for this comment");
                Vec::new()
            }
        };

        let mut children = Vec::with_capacity(replies.len());
        for reply in &replies {
            children.push(extract_comment(session, reply).await);
        }

        Comment {
            text,
            score,
            replies: children,
        }
    })
}

async fn read_text_and_score(
    session: &dyn BrowserSession,
    element: &ElementRef,
) -> std::result::Result<(String, i64), BrowserError> {
    let slot = session
        .find_all(Some(element), COMMENT_TEXT_SELECTOR)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| BrowserError::NoSuchElement(COMMENT_TEXT_SELECTOR.to_string()))?;

    let text = session.text(&slot).await?.trim().to_string();
    let score = session
        .attribute(element, SCORE_ATTRIBUTE)
        .await?
        .as_deref()
        .map(parse_score)
        .unwrap_or(0);

    Ok((text, score))
}

/// Scores are integers on the page; anything else counts as 0.
fn parse_score(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

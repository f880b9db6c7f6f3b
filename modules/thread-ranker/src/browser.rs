// Browser capability seam for the comment scraper.
//
// BrowserLauncher hands out one BrowserSession per scrape. The production
// pair drives a W3C WebDriver server; FakeBrowser in testing.rs serves an
// in-memory DOM.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;
use webdriver_client::{ChromeOptions, ElementId, Session, WebDriverClient, WebDriverError};

use crate::error::RankerError;

pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("No such element: {0}")]
    NoSuchElement(String),

    #[error("Click intercepted: {0}")]
    ClickIntercepted(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Browser automation failed: {0}")]
    Driver(String),
}

impl From<WebDriverError> for BrowserError {
    fn from(err: WebDriverError) -> Self {
        if err.is_no_such_element() {
            BrowserError::NoSuchElement(err.to_string())
        } else if err.is_click_intercepted() {
            BrowserError::ClickIntercepted(err.to_string())
        } else if err.is_timeout() {
            BrowserError::Timeout(err.to_string())
        } else {
            BrowserError::Driver(err.to_string())
        }
    }
}

impl From<BrowserError> for RankerError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Timeout(msg) => RankerError::AutomationTimeout(msg),
            other => RankerError::Browser(other.to_string()),
        }
    }
}

/// Handle to an element inside one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

// --- Capability traits ---

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    /// All elements matching a CSS selector, searched from the document when
    /// `scope` is `None` and beneath `scope` otherwise. Empty when none match.
    async fn find_all(
        &self,
        scope: Option<&ElementRef>,
        selector: &str,
    ) -> BrowserResult<Vec<ElementRef>>;

    async fn text(&self, element: &ElementRef) -> BrowserResult<String>;

    async fn attribute(&self, element: &ElementRef, name: &str) -> BrowserResult<Option<String>>;

    async fn scroll_into_view(&self, element: &ElementRef) -> BrowserResult<()>;

    async fn click(&self, element: &ElementRef) -> BrowserResult<()>;

    /// Click through script, for elements covered by an overlay.
    async fn script_click(&self, element: &ElementRef) -> BrowserResult<()>;

    /// Release the browser. Called exactly once per session.
    async fn quit(self: Box<Self>) -> BrowserResult<()>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>>;
}

/// Poll until at least one element matches `selector`, or fail with
/// `BrowserError::Timeout` once `timeout` has elapsed.
pub async fn wait_for_any(
    session: &dyn BrowserSession,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> BrowserResult<Vec<ElementRef>> {
    let deadline = Instant::now() + timeout;

    loop {
        let found = session.find_all(None, selector).await?;
        if !found.is_empty() {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout(format!(
                "no element matched {selector} within {}ms",
                timeout.as_millis()
            )));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

// --- WebDriver implementation ---

pub struct WebDriverLauncher {
    client: WebDriverClient,
    options: ChromeOptions,
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: &str, headless: bool) -> Result<Self, RankerError> {
        let client = WebDriverClient::new(webdriver_url)
            .map_err(|e| RankerError::Browser(e.to_string()))?;

        let mut options = ChromeOptions::default()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");
        if headless {
            options = options.arg("--headless=new");
        }

        Ok(Self { client, options })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let session = self.client.new_session(&self.options).await?;
        debug!(session_id = session.id(), "Browser session started");
        Ok(Box::new(WebDriverSession { session }))
    }
}

struct WebDriverSession {
    session: Session,
}

fn element_id(element: &ElementRef) -> ElementId {
    ElementId(element.0.clone())
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        Ok(self.session.navigate(url).await?)
    }

    async fn find_all(
        &self,
        scope: Option<&ElementRef>,
        selector: &str,
    ) -> BrowserResult<Vec<ElementRef>> {
        let found = match scope {
            Some(parent) => {
                self.session
                    .find_elements_from(&element_id(parent), selector)
                    .await?
            }
            None => self.session.find_elements(selector).await?,
        };
        Ok(found.into_iter().map(|id| ElementRef(id.0)).collect())
    }

    async fn text(&self, element: &ElementRef) -> BrowserResult<String> {
        Ok(self.session.element_text(&element_id(element)).await?)
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> BrowserResult<Option<String>> {
        Ok(self
            .session
            .element_attribute(&element_id(element), name)
            .await?)
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> BrowserResult<()> {
        Ok(self.session.scroll_into_view(&element_id(element)).await?)
    }

    async fn click(&self, element: &ElementRef) -> BrowserResult<()> {
        Ok(self.session.click(&element_id(element)).await?)
    }

    async fn script_click(&self, element: &ElementRef) -> BrowserResult<()> {
        Ok(self.session.script_click(&element_id(element)).await?)
    }

    async fn quit(self: Box<Self>) -> BrowserResult<()> {
        let id = self.session.id().to_string();
        self.session.delete().await?;
        debug!(session_id = %id, "Browser session released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBrowser;

    #[test]
    fn webdriver_codes_map_to_browser_errors() {
        let intercepted = WebDriverError::Command {
            status: 400,
            code: "element click intercepted".into(),
            message: "overlay".into(),
        };
        assert!(matches!(
            BrowserError::from(intercepted),
            BrowserError::ClickIntercepted(_)
        ));

        let missing = WebDriverError::Command {
            status: 404,
            code: "no such element".into(),
            message: "gone".into(),
        };
        assert!(matches!(BrowserError::from(missing), BrowserError::NoSuchElement(_)));

        let other = WebDriverError::Network("refused".into());
        assert!(matches!(BrowserError::from(other), BrowserError::Driver(_)));
    }

    #[test]
    fn timeout_maps_to_automation_timeout() {
        let err: RankerError = BrowserError::Timeout("tree".into()).into();
        assert!(matches!(err, RankerError::AutomationTimeout(_)));
    }

    #[tokio::test]
    async fn wait_for_any_times_out_on_empty_page() {
        let browser = FakeBrowser::new();
        let session = browser.launch().await.unwrap();

        let err = wait_for_any(
            session.as_ref(),
            "shreddit-comment-tree",
            Duration::from_millis(20),
            Duration::from_millis(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BrowserError::Timeout(_)));
    }

    #[tokio::test]
    async fn wait_for_any_returns_present_elements() {
        let browser = FakeBrowser::new().with_comment_tree();
        let session = browser.launch().await.unwrap();

        let found = wait_for_any(
            session.as_ref(),
            "shreddit-comment-tree",
            Duration::from_millis(20),
            Duration::from_millis(5),
        )
        .await
        .unwrap();

        assert_eq!(found.len(), 1);
    }
}

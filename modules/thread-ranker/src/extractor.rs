use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::error::{RankerError, Result};
use crate::types::ThreadDocument;

/// Fixed desktop browser user agent; the thread pages refuse obvious bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("shreddit-title").expect("valid selector"));
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div[id$='-post-rtjson-content']").expect("valid selector")
});
static PARAGRAPH_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

// --- ThreadExtractor trait ---

#[async_trait]
pub trait ThreadExtractor: Send + Sync {
    /// Fetch a thread page and pull out its title and body. Never fails:
    /// transport problems come back as an absent document.
    async fn extract(&self, url: &str) -> ThreadDocument;
}

// --- HTTP + HTML extractor ---

pub struct HttpThreadExtractor {
    client: reqwest::Client,
}

impl HttpThreadExtractor {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| RankerError::Transport(format!("invalid URL {url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(RankerError::Transport(format!(
                "only http/https URLs are allowed, got: {}",
                parsed.scheme()
            )));
        }

        let resp = self.client.get(parsed).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RankerError::Transport(format!("{url} returned {status}")));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl ThreadExtractor for HttpThreadExtractor {
    async fn extract(&self, url: &str) -> ThreadDocument {
        match self.fetch(url).await {
            Ok(html) => {
                let doc = parse_thread_document(&html);
                debug!(
                    url,
                    has_title = doc.title.is_some(),
                    has_body = doc.body.is_some(),
                    "Extracted thread document"
                );
                doc
            }
            Err(e) => {
                warn!(url, error = %e, "Error fetching the thread page");
                ThreadDocument::absent()
            }
        }
    }
}

/// Pull the title attribute and the post body paragraphs out of thread HTML.
pub fn parse_thread_document(html: &str) -> ThreadDocument {
    let doc = Html::parse_document(html);

    let title = match extract_title(&doc) {
        Ok(title) => Some(title),
        Err(e) => {
            debug!(error = %e, "No title on page");
            None
        }
    };

    let body = match extract_body(&doc) {
        Ok(body) => Some(body),
        Err(e) => {
            debug!(error = %e, "No body on page");
            None
        }
    };

    ThreadDocument { title, body }
}

fn extract_title(doc: &Html) -> Result<String> {
    doc.select(&TITLE_SEL)
        .next()
        .and_then(|el| el.value().attr("title"))
        .map(str::to_string)
        .ok_or_else(|| RankerError::ExtractionMiss("shreddit-title[title]".into()))
}

fn extract_body(doc: &Html) -> Result<String> {
    let container = doc
        .select(&BODY_SEL)
        .next()
        .ok_or_else(|| RankerError::ExtractionMiss("post rtjson content container".into()))?;

    Ok(container
        .select(&PARAGRAPH_SEL)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const THREAD_HTML: &str = r#"<!DOCTYPE html>
<html><body>
  <shreddit-title title="What in your opinion, is the BEST fantasy novel? : r/Fantasy"></shreddit-title>
  <shreddit-post>
    <div id="t3_abc123-post-rtjson-content" class="md">
      <p>Sometime last night I asked about the worst.</p>
      <p>Now I want to know what you all think is the <strong>best</strong>.</p>
    </div>
  </shreddit-post>
</body></html>"#;

    #[test]
    fn parses_title_and_paragraphs_in_order() {
        let doc = parse_thread_document(THREAD_HTML);

        assert_eq!(
            doc.title.as_deref(),
            Some("What in your opinion, is the BEST fantasy novel? : r/Fantasy")
        );
        assert_eq!(
            doc.body.as_deref(),
            Some("Sometime last night I asked about the worst.\nNow I want to know what you all think is the best.")
        );
    }

    #[test]
    fn missing_markup_yields_absent_fields() {
        let doc = parse_thread_document("<html><body><h1>Not a thread</h1></body></html>");
        assert_eq!(doc, ThreadDocument::absent());
    }

    #[test]
    fn container_id_must_end_with_suffix() {
        let html = r#"<div id="post-rtjson-content-extra"><p>nope</p></div>"#;
        assert_eq!(parse_thread_document(html).body, None);
    }

    #[test]
    fn title_element_without_attribute_is_absent() {
        let html = r#"<shreddit-title>Visible text only</shreddit-title>"#;
        assert_eq!(parse_thread_document(html).title, None);
    }

    #[tokio::test]
    async fn fetch_sends_browser_user_agent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/r/Fantasy/comments/abc123/best/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(THREAD_HTML))
            .expect(1)
            .mount(&server)
            .await;

        let extractor = HttpThreadExtractor::new().unwrap();
        let doc = extractor
            .extract(&format!("{}/r/Fantasy/comments/abc123/best/", server.uri()))
            .await;

        assert!(doc.title.is_some());
        assert!(doc.body.is_some());

        // The agent contains commas, which header() would split on.
        let requests = server.received_requests().await.unwrap();
        let agent = requests[0]
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok());
        assert_eq!(agent, Some(BROWSER_USER_AGENT));
    }

    #[tokio::test]
    async fn http_error_degrades_to_absent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = HttpThreadExtractor::new().unwrap();
        let doc = extractor
            .extract(&format!("{}/r/gone/comments/x/", server.uri()))
            .await;

        assert_eq!(doc, ThreadDocument::absent());
    }

    #[tokio::test]
    async fn unsupported_scheme_degrades_to_absent() {
        let extractor = HttpThreadExtractor::new().unwrap();
        let doc = extractor.extract("ftp://reddit.com/r/x").await;
        assert_eq!(doc, ThreadDocument::absent());
    }
}

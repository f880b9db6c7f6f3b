// Test doubles for the ranker pipeline.
//
// One per trait boundary:
// - MockModel (LanguageModel + TokenCounter): scripted or rule-based replies
// - MockSearcher (WebSearcher): HashMap query→URLs
// - MockExtractor (ThreadExtractor): HashMap URL→ThreadDocument
// - MockScraper (CommentScraper): HashMap URL→comment forest
// - FakeBrowser (BrowserLauncher): in-memory DOM of element ids keyed by selector

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use ai_client::AiError;
use async_trait::async_trait;

use crate::browser::{BrowserError, BrowserLauncher, BrowserResult, BrowserSession, ElementRef};
use crate::comments::{
    CommentScraper, COMMENT_TEXT_SELECTOR, COMMENT_TREE_SELECTOR, LOAD_MORE_SELECTOR,
    REPLY_SELECTOR, ROOT_COMMENT_SELECTOR, SCORE_ATTRIBUTE,
};
use crate::error::{RankerError, Result};
use crate::extractor::ThreadExtractor;
use crate::search::WebSearcher;
use crate::traits::{LanguageModel, TokenCounter};
use crate::types::{Comment, SearchResult, ThreadDocument};

// ---------------------------------------------------------------------------
// MockModel
// ---------------------------------------------------------------------------

/// One recorded `complete` call.
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

enum Scripted {
    Reply(String),
    Status(u16),
}

/// Language model double. Replies are resolved in order: the first rule whose
/// needle appears in the prompt, then the scripted queue, then "NO".
pub struct MockModel {
    rules: Vec<(String, String)>,
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<ModelCall>>,
    token_count: Option<u64>,
    counted: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            token_count: Some(0),
            counted: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply.
    pub fn respond(self, text: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(text.to_string()));
        self
    }

    /// Queue an API failure with the given HTTP status.
    pub fn fail_with_status(self, status: u16) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Status(status));
        self
    }

    /// Reply with `text` whenever the prompt contains `needle`.
    pub fn respond_when(mut self, needle: &str, text: &str) -> Self {
        self.rules.push((needle.to_string(), text.to_string()));
        self
    }

    pub fn with_token_count(mut self, count: u64) -> Self {
        self.token_count = Some(count);
        self
    }

    /// Make `count_tokens` fail.
    pub fn failing_token_count(mut self) -> Self {
        self.token_count = None;
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts passed to `count_tokens`.
    pub fn counted(&self) -> Vec<String> {
        self.counted.lock().unwrap().clone()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> ai_client::Result<String> {
        self.calls.lock().unwrap().push(ModelCall {
            prompt: prompt.to_string(),
            max_tokens,
            temperature,
        });

        if let Some((_, reply)) = self.rules.iter().find(|(needle, _)| prompt.contains(needle)) {
            return Ok(reply.clone());
        }

        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Status(status)) => Err(AiError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            None => Ok("NO".to_string()),
        }
    }
}

#[async_trait]
impl TokenCounter for MockModel {
    async fn count_tokens(&self, text: &str) -> ai_client::Result<u64> {
        self.counted.lock().unwrap().push(text.to_string());
        self.token_count
            .ok_or_else(|| AiError::Network("token counting unavailable".to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

/// HashMap-based searcher. Returns `Err` for unregistered queries.
pub struct MockSearcher {
    results: HashMap<String, Vec<String>>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn on_query(mut self, query: &str, urls: &[&str]) -> Self {
        self.results.insert(
            query.to_string(),
            urls.iter().map(|u| u.to_string()).collect(),
        );
        self
    }

    /// (query, max_results) pairs in call order.
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));

        let urls = self
            .results
            .get(query)
            .ok_or_else(|| RankerError::Transport(format!("no results registered for {query}")))?;
        Ok(urls
            .iter()
            .take(max_results)
            .map(|url| SearchResult { url: url.clone() })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// HashMap-based extractor. Unregistered URLs come back absent.
pub struct MockExtractor {
    documents: HashMap<String, ThreadDocument>,
    requested: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn on_thread(mut self, url: &str, title: &str, body: &str) -> Self {
        self.documents.insert(
            url.to_string(),
            ThreadDocument {
                title: Some(title.to_string()),
                body: Some(body.to_string()),
            },
        );
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThreadExtractor for MockExtractor {
    async fn extract(&self, url: &str) -> ThreadDocument {
        self.requested.lock().unwrap().push(url.to_string());
        self.documents
            .get(url)
            .cloned()
            .unwrap_or_else(ThreadDocument::absent)
    }
}

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

/// HashMap-based comment scraper. Unregistered URLs have no comments.
pub struct MockScraper {
    threads: HashMap<String, Vec<Comment>>,
    failing: HashSet<String>,
    scraped: Mutex<Vec<String>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self {
            threads: HashMap::new(),
            failing: HashSet::new(),
            scraped: Mutex::new(Vec::new()),
        }
    }

    pub fn on_thread(mut self, url: &str, comments: Vec<Comment>) -> Self {
        self.threads.insert(url.to_string(), comments);
        self
    }

    /// Fail the scrape as if the browser could not be started.
    pub fn fail_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn scraped(&self) -> Vec<String> {
        self.scraped.lock().unwrap().clone()
    }
}

impl Default for MockScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentScraper for MockScraper {
    async fn scrape(&self, url: &str) -> Result<Vec<Comment>> {
        self.scraped.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(RankerError::Browser(format!("could not start browser for {url}")));
        }
        Ok(self.threads.get(url).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// FakeBrowser
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeDom {
    /// (scope element, selector) → matching element ids.
    matches: HashMap<(Option<String>, String), Vec<String>>,
    texts: HashMap<String, String>,
    attributes: HashMap<(String, String), String>,
    /// Reply controls still to appear; the next round shows once the
    /// current one has been clicked away.
    pending_buttons: VecDeque<Vec<String>>,
    visible_buttons: Vec<String>,
    intercepted: HashSet<String>,
    fail_launch: bool,
    launches: usize,
    quits: usize,
    navigations: Vec<String>,
    clicks: Vec<String>,
    script_clicks: Vec<String>,
}

/// In-memory browser. Clones share the same DOM and call log.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    dom: Arc<Mutex<FakeDom>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the comment tree container present.
    pub fn with_comment_tree(self) -> Self {
        self.insert(None, COMMENT_TREE_SELECTOR, "tree");
        self
    }

    /// Add a comment. `parent` of `None` makes it top-level. A `text` of
    /// `None` leaves out the text slot; a `score` of `None` leaves out the
    /// score attribute.
    pub fn comment(
        self,
        parent: Option<&str>,
        id: &str,
        text: Option<&str>,
        score: Option<&str>,
    ) -> Self {
        match parent {
            None => self.insert(None, ROOT_COMMENT_SELECTOR, id),
            Some(parent) => self.insert(Some(parent), REPLY_SELECTOR, id),
        }
        {
            let mut dom = self.dom.lock().unwrap();
            if let Some(text) = text {
                let slot = format!("{id}/text");
                dom.matches
                    .entry((Some(id.to_string()), COMMENT_TEXT_SELECTOR.to_string()))
                    .or_default()
                    .push(slot.clone());
                dom.texts.insert(slot, text.to_string());
            }
            if let Some(score) = score {
                dom.attributes
                    .insert((id.to_string(), SCORE_ATTRIBUTE.to_string()), score.to_string());
            }
        }
        self
    }

    /// Queue one round of "more replies" controls.
    pub fn load_more_round(self, ids: &[&str]) -> Self {
        self.dom
            .lock()
            .unwrap()
            .pending_buttons
            .push_back(ids.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Native clicks on this element fail as intercepted.
    pub fn intercept_clicks_on(self, id: &str) -> Self {
        self.dom.lock().unwrap().intercepted.insert(id.to_string());
        self
    }

    pub fn failing_launch(self) -> Self {
        self.dom.lock().unwrap().fail_launch = true;
        self
    }

    pub fn launches(&self) -> usize {
        self.dom.lock().unwrap().launches
    }

    pub fn quits(&self) -> usize {
        self.dom.lock().unwrap().quits
    }

    pub fn navigations(&self) -> Vec<String> {
        self.dom.lock().unwrap().navigations.clone()
    }

    /// Elements activated by either click path, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.dom.lock().unwrap().clicks.clone()
    }

    pub fn script_clicks(&self) -> Vec<String> {
        self.dom.lock().unwrap().script_clicks.clone()
    }

    fn insert(&self, scope: Option<&str>, selector: &str, id: &str) {
        self.dom
            .lock()
            .unwrap()
            .matches
            .entry((scope.map(str::to_string), selector.to_string()))
            .or_default()
            .push(id.to_string());
    }
}

#[async_trait]
impl BrowserLauncher for FakeBrowser {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let mut dom = self.dom.lock().unwrap();
        if dom.fail_launch {
            return Err(BrowserError::Driver("session not created".to_string()));
        }
        dom.launches += 1;
        Ok(Box::new(FakeSession {
            dom: Arc::clone(&self.dom),
        }))
    }
}

struct FakeSession {
    dom: Arc<Mutex<FakeDom>>,
}

impl FakeSession {
    fn activate(dom: &mut FakeDom, element: &ElementRef) {
        dom.visible_buttons.retain(|id| id != &element.0);
        dom.clicks.push(element.0.clone());
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.dom.lock().unwrap().navigations.push(url.to_string());
        Ok(())
    }

    async fn find_all(
        &self,
        scope: Option<&ElementRef>,
        selector: &str,
    ) -> BrowserResult<Vec<ElementRef>> {
        let mut dom = self.dom.lock().unwrap();

        if scope.is_none() && selector == LOAD_MORE_SELECTOR {
            if dom.visible_buttons.is_empty() {
                if let Some(next) = dom.pending_buttons.pop_front() {
                    dom.visible_buttons = next;
                }
            }
            return Ok(dom.visible_buttons.iter().cloned().map(ElementRef).collect());
        }

        let key = (scope.map(|e| e.0.clone()), selector.to_string());
        Ok(dom
            .matches
            .get(&key)
            .map(|ids| ids.iter().cloned().map(ElementRef).collect())
            .unwrap_or_default())
    }

    async fn text(&self, element: &ElementRef) -> BrowserResult<String> {
        self.dom
            .lock()
            .unwrap()
            .texts
            .get(&element.0)
            .cloned()
            .ok_or_else(|| BrowserError::NoSuchElement(element.0.clone()))
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> BrowserResult<Option<String>> {
        Ok(self
            .dom
            .lock()
            .unwrap()
            .attributes
            .get(&(element.0.clone(), name.to_string()))
            .cloned())
    }

    async fn scroll_into_view(&self, _element: &ElementRef) -> BrowserResult<()> {
        Ok(())
    }

    async fn click(&self, element: &ElementRef) -> BrowserResult<()> {
        let mut dom = self.dom.lock().unwrap();
        if dom.intercepted.contains(&element.0) {
            return Err(BrowserError::ClickIntercepted(element.0.clone()));
        }
        Self::activate(&mut dom, element);
        Ok(())
    }

    async fn script_click(&self, element: &ElementRef) -> BrowserResult<()> {
        let mut dom = self.dom.lock().unwrap();
        dom.script_clicks.push(element.0.clone());
        Self::activate(&mut dom, element);
        Ok(())
    }

    async fn quit(self: Box<Self>) -> BrowserResult<()> {
        self.dom.lock().unwrap().quits += 1;
        Ok(())
    }
}

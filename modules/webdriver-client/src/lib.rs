pub mod error;

pub use error::{Result, WebDriverError};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// W3C web element identifier key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Opaque element reference handed out by the remote end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

impl ElementId {
    fn to_json(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }
}

/// Chrome launch options sent as `goog:chromeOptions` capabilities.
#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    pub args: Vec<String>,
}

impl ChromeOptions {
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn capabilities(&self) -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": self.args },
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

pub struct WebDriverClient {
    client: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Start a new browser session. The caller owns the session and must
    /// call [`Session::delete`] to release the browser.
    pub async fn new_session(&self, options: &ChromeOptions) -> Result<Session> {
        let endpoint = format!("{}/session", self.base_url);
        debug!(endpoint = %endpoint, args = ?options.args, "WebDriver new session");

        let resp = self
            .client
            .post(&endpoint)
            .json(&options.capabilities())
            .send()
            .await?;

        let created: NewSession = decode(resp).await?;
        debug!(session_id = %created.session_id, "WebDriver session created");

        Ok(Session {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", self.base_url, created.session_id),
            id: created.session_id,
        })
    }
}

/// A live browser session on the remote end.
pub struct Session {
    client: reqwest::Client,
    session_url: String,
    id: String,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.post::<Value>("url", json!({ "url": url })).await?;
        Ok(())
    }

    /// Find all elements matching a CSS selector in the document.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<ElementId>> {
        let found: Vec<Value> = self
            .post("elements", json!({ "using": "css selector", "value": selector }))
            .await?;
        element_ids(found)
    }

    /// Find all elements matching a CSS selector beneath `parent`.
    pub async fn find_elements_from(
        &self,
        parent: &ElementId,
        selector: &str,
    ) -> Result<Vec<ElementId>> {
        let found: Vec<Value> = self
            .post(
                &format!("element/{}/elements", parent.0),
                json!({ "using": "css selector", "value": selector }),
            )
            .await?;
        element_ids(found)
    }

    pub async fn element_text(&self, element: &ElementId) -> Result<String> {
        self.get(&format!("element/{}/text", element.0)).await
    }

    /// Returns `None` when the attribute is not present on the element.
    pub async fn element_attribute(
        &self,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>> {
        self.get(&format!("element/{}/attribute/{}", element.0, name))
            .await
    }

    pub async fn click(&self, element: &ElementId) -> Result<()> {
        self.post::<Value>(&format!("element/{}/click", element.0), json!({}))
            .await?;
        Ok(())
    }

    /// Run a synchronous script. `args` are passed as `arguments[i]`.
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.post("execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    pub async fn scroll_into_view(&self, element: &ElementId) -> Result<()> {
        self.execute("arguments[0].scrollIntoView(true);", vec![element.to_json()])
            .await?;
        Ok(())
    }

    /// Click through script, bypassing overlays that intercept pointer events.
    pub async fn script_click(&self, element: &ElementId) -> Result<()> {
        self.execute("arguments[0].click();", vec![element.to_json()])
            .await?;
        Ok(())
    }

    /// End the session and close the browser.
    pub async fn delete(self) -> Result<()> {
        debug!(session_id = %self.id, "WebDriver delete session");
        let resp = self.client.delete(&self.session_url).send().await?;
        decode::<Value>(resp).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(format!("{}/{}", self.session_url, path))
            .send()
            .await?;
        decode(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        let resp = self
            .client
            .post(format!("{}/{}", self.session_url, path))
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<Envelope<ErrorValue>>(&body) {
            Ok(env) => WebDriverError::Command {
                status: status.as_u16(),
                code: env.value.error,
                message: env.value.message,
            },
            Err(_) => WebDriverError::Command {
                status: status.as_u16(),
                code: "unknown error".to_string(),
                message: body,
            },
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(&body)?;
    Ok(envelope.value)
}

fn element_ids(values: Vec<Value>) -> Result<Vec<ElementId>> {
    values
        .into_iter()
        .map(|v| {
            v.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| ElementId(id.to_string()))
                .ok_or_else(|| WebDriverError::Protocol(format!("not an element reference: {v}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn session(server: &MockServer) -> Session {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "abc", "capabilities": {} }
            })))
            .mount(server)
            .await;

        WebDriverClient::new(&server.uri())
            .unwrap()
            .new_session(&ChromeOptions::default().arg("--no-sandbox"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn new_session_sends_chrome_args() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/session"))
            .and(body_partial_json(json!({
                "capabilities": { "alwaysMatch": {
                    "goog:chromeOptions": { "args": ["--no-sandbox", "--disable-dev-shm-usage"] }
                }}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "s-1", "capabilities": {} }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let options = ChromeOptions::default()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");
        let session = WebDriverClient::new(&server.uri())
            .unwrap()
            .new_session(&options)
            .await
            .unwrap();

        assert_eq!(session.id(), "s-1");
    }

    #[tokio::test]
    async fn find_elements_decodes_references() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/elements"))
            .and(body_partial_json(json!({ "using": "css selector" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { ELEMENT_KEY: "e1" },
                    { ELEMENT_KEY: "e2" }
                ]
            })))
            .mount(&server)
            .await;

        let found = session.find_elements("shreddit-comment").await.unwrap();
        assert_eq!(found, vec![ElementId("e1".into()), ElementId("e2".into())]);
    }

    #[tokio::test]
    async fn missing_attribute_is_none() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("GET"))
            .and(path("/session/abc/element/e1/attribute/score"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .mount(&server)
            .await;

        let score = session
            .element_attribute(&ElementId("e1".into()), "score")
            .await
            .unwrap();
        assert_eq!(score, None);
    }

    #[tokio::test]
    async fn intercepted_click_maps_to_error_code() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/element/e1/click"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "value": {
                    "error": "element click intercepted",
                    "message": "Other element would receive the click",
                    "stacktrace": ""
                }
            })))
            .mount(&server)
            .await;

        let err = session.click(&ElementId("e1".into())).await.unwrap_err();
        assert!(err.is_click_intercepted());
        assert!(!err.is_no_such_element());
    }

    #[tokio::test]
    async fn non_json_error_body_is_still_a_command_error() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/url"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = session.navigate("https://www.reddit.com/r/Fantasy/").await.unwrap_err();
        match err {
            WebDriverError::Command { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected Command error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn script_click_passes_element_argument() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/execute/sync"))
            .and(body_partial_json(json!({
                "script": "arguments[0].click();",
                "args": [{ ELEMENT_KEY: "e9" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .expect(1)
            .mount(&server)
            .await;

        session.script_click(&ElementId("e9".into())).await.unwrap();
    }
}

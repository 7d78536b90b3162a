//! # WebDriver Client Module
//!
//! ## Purpose
//! Minimal W3C WebDriver client speaking the wire protocol (JSON over HTTP)
//! directly to a chromedriver endpoint. Covers exactly the commands the
//! scrape pipeline needs: session lifecycle, navigation, XPath element
//! lookup (document- and element-scoped), clear/type/read, script-level
//! click and bounded polling waits.
//!
//! ## Input/Output Specification
//! - **Input**: WebDriver endpoint URL, session capabilities, commands
//! - **Output**: Element references, element text, protocol-level faults
//! - **Waits**: polling with a fixed maximum duration; expiry is a
//!   source-unavailable fault, not a protocol fault

use crate::config::WebDriverConfig;
use crate::errors::{CheckerError, Result};
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// W3C element reference key in protocol payloads
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Interval between attempts inside a bounded wait
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Opaque reference to a DOM element inside one session
#[derive(Debug, Clone)]
pub struct ElementRef {
    id: String,
}

/// Client bound to one WebDriver endpoint
pub struct WebDriverClient {
    http: reqwest::Client,
    server_url: String,
}

/// One live WebDriver session
pub struct Session {
    http: reqwest::Client,
    server_url: String,
    id: String,
}

/// True when the error is the protocol's "no such element" answer, which the
/// pipeline treats as a localized miss rather than a session fault.
pub fn is_no_such_element(err: &CheckerError) -> bool {
    matches!(err, CheckerError::WebDriver { details, .. } if details.starts_with("no such element"))
}

impl WebDriverClient {
    /// Build a client for the configured endpoint
    pub fn new(config: &WebDriverConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("arbitr-checker/0.1")
            .build()
            .map_err(CheckerError::Network)?;

        Ok(Self {
            http,
            server_url: config.server_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new session with the given `alwaysMatch` capabilities
    pub async fn new_session(&self, capabilities: Value) -> Result<Session> {
        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });
        let value = command(
            &self.http,
            Method::POST,
            &format!("{}/session", self.server_url),
            Some(body),
            "new session",
        )
        .await?;

        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| CheckerError::WebDriver {
                operation: "new session".to_string(),
                details: "response carried no sessionId".to_string(),
            })?
            .to_string();

        tracing::info!("WebDriver session created: {}", id);
        Ok(Session {
            http: self.http.clone(),
            server_url: self.server_url.clone(),
            id,
        })
    }
}

impl Session {
    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.server_url, self.id, path)
    }

    async fn cmd(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        operation: &str,
    ) -> Result<Value> {
        command(&self.http, method, &self.url(path), body, operation).await
    }

    /// Navigate to a URL
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.cmd(Method::POST, "/url", Some(json!({ "url": url })), "navigate")
            .await?;
        Ok(())
    }

    /// Find a single element by XPath
    pub async fn find_element(&self, xpath: &str) -> Result<ElementRef> {
        let value = self
            .cmd(
                Method::POST,
                "/element",
                Some(locator(xpath)),
                "find element",
            )
            .await?;
        element_from_value(&value, "find element")
    }

    /// Find all elements matching an XPath
    pub async fn find_elements(&self, xpath: &str) -> Result<Vec<ElementRef>> {
        let value = self
            .cmd(
                Method::POST,
                "/elements",
                Some(locator(xpath)),
                "find elements",
            )
            .await?;
        elements_from_value(&value)
    }

    /// Find a single element by XPath, scoped under another element
    pub async fn find_element_from(&self, parent: &ElementRef, xpath: &str) -> Result<ElementRef> {
        let value = self
            .cmd(
                Method::POST,
                &format!("/element/{}/element", parent.id),
                Some(locator(xpath)),
                "find element (scoped)",
            )
            .await?;
        element_from_value(&value, "find element (scoped)")
    }

    /// Find all elements matching an XPath, scoped under another element
    pub async fn find_elements_from(
        &self,
        parent: &ElementRef,
        xpath: &str,
    ) -> Result<Vec<ElementRef>> {
        let value = self
            .cmd(
                Method::POST,
                &format!("/element/{}/elements", parent.id),
                Some(locator(xpath)),
                "find elements (scoped)",
            )
            .await?;
        elements_from_value(&value)
    }

    /// Clear an editable element
    pub async fn clear(&self, element: &ElementRef) -> Result<()> {
        self.cmd(
            Method::POST,
            &format!("/element/{}/clear", element.id),
            Some(json!({})),
            "clear",
        )
        .await?;
        Ok(())
    }

    /// Type text into an element
    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.cmd(
            Method::POST,
            &format!("/element/{}/value", element.id),
            Some(json!({ "text": text })),
            "send keys",
        )
        .await?;
        Ok(())
    }

    /// Read the rendered text of an element
    pub async fn text(&self, element: &ElementRef) -> Result<String> {
        let value = self
            .cmd(
                Method::GET,
                &format!("/element/{}/text", element.id),
                None,
                "element text",
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Whether an element is enabled
    pub async fn enabled(&self, element: &ElementRef) -> Result<bool> {
        let value = self
            .cmd(
                Method::GET,
                &format!("/element/{}/enabled", element.id),
                None,
                "element enabled",
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Click an element through script execution. Bypasses overlay and
    /// visibility interception that a native click is subject to.
    pub async fn script_click(&self, element: &ElementRef) -> Result<()> {
        self.cmd(
            Method::POST,
            "/execute/sync",
            Some(json!({
                "script": "arguments[0].click();",
                "args": [{ ELEMENT_KEY: element.id }],
            })),
            "script click",
        )
        .await?;
        Ok(())
    }

    /// Bounded wait for an element to be present. Expiry is reported as a
    /// source-unavailable fault naming the waited-for stage.
    pub async fn wait_for_element(
        &self,
        xpath: &str,
        timeout: Duration,
        stage: &str,
    ) -> Result<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_element(xpath).await {
                Ok(element) => return Ok(element),
                Err(err) if is_no_such_element(&err) => {
                    if Instant::now() >= deadline {
                        return Err(CheckerError::SourceUnavailable {
                            stage: stage.to_string(),
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                    sleep(POLL_INTERVAL).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Bounded wait for an element to be present and enabled
    pub async fn wait_for_enabled(
        &self,
        xpath: &str,
        timeout: Duration,
        stage: &str,
    ) -> Result<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_element(xpath).await {
                Ok(element) => {
                    if self.enabled(&element).await? {
                        return Ok(element);
                    }
                }
                Err(err) if is_no_such_element(&err) => {}
                Err(err) => return Err(err),
            }
            if Instant::now() >= deadline {
                return Err(CheckerError::SourceUnavailable {
                    stage: stage.to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// End the session. Failures are logged, not propagated: teardown runs on
    /// error paths where the original fault must survive.
    pub async fn close(self) {
        if let Err(e) = self
            .cmd(Method::DELETE, "", None, "delete session")
            .await
        {
            tracing::warn!("Failed to close WebDriver session {}: {}", self.id, e);
        } else {
            tracing::info!("WebDriver session closed: {}", self.id);
        }
    }
}

fn locator(xpath: &str) -> Value {
    json!({ "using": "xpath", "value": xpath })
}

fn element_from_value(value: &Value, operation: &str) -> Result<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementRef { id: id.to_string() })
        .ok_or_else(|| CheckerError::WebDriver {
            operation: operation.to_string(),
            details: "response carried no element reference".to_string(),
        })
}

fn elements_from_value(value: &Value) -> Result<Vec<ElementRef>> {
    let items = value.as_array().cloned().unwrap_or_default();
    items
        .iter()
        .map(|item| element_from_value(item, "find elements"))
        .collect()
}

/// Send one protocol command and unwrap the `value` envelope. Protocol-level
/// failures (non-2xx with an error body) become [`CheckerError::WebDriver`]
/// carrying the protocol error code.
async fn command(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
    operation: &str,
) -> Result<Value> {
    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response.json().await?;

    if !status.is_success() {
        let error = payload
            .pointer("/value/error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = payload
            .pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or("");
        return Err(CheckerError::WebDriver {
            operation: operation.to_string(),
            details: format!("{}: {}", error, message),
        });
    }

    Ok(payload.get("value").cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebDriverConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> WebDriverConfig {
        WebDriverConfig {
            server_url: server.uri(),
            request_timeout_secs: 5,
            window_size: "1920,1080".to_string(),
        }
    }

    async fn mock_session(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": { "sessionId": "abc123", "capabilities": {} }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_session_create_posts_capabilities() {
        let server = MockServer::start().await;

        // The mock only matches when the capabilities envelope is present, so
        // session creation fails unless the payload is shaped correctly.
        Mock::given(method("POST"))
            .and(path("/session"))
            .and(body_partial_json(serde_json::json!({
                "capabilities": { "alwaysMatch": { "browserName": "chrome" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": { "sessionId": "abc123", "capabilities": {} }
            })))
            .mount(&server)
            .await;

        let client = WebDriverClient::new(&test_config(&server)).unwrap();
        let session = client
            .new_session(serde_json::json!({ "browserName": "chrome" }))
            .await
            .unwrap();
        assert_eq!(session.id, "abc123");
    }

    #[tokio::test]
    async fn test_find_element_returns_reference() {
        let server = MockServer::start().await;
        mock_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc123/element"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": { ELEMENT_KEY: "el-7" }
            })))
            .mount(&server)
            .await;

        let client = WebDriverClient::new(&test_config(&server)).unwrap();
        let session = client.new_session(serde_json::json!({})).await.unwrap();
        let element = session.find_element("//textarea").await.unwrap();
        assert_eq!(element.id, "el-7");
    }

    #[tokio::test]
    async fn test_wait_for_element_expiry_is_source_unavailable() {
        let server = MockServer::start().await;
        mock_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc123/element"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "value": { "error": "no such element", "message": "not found" }
            })))
            .mount(&server)
            .await;

        let client = WebDriverClient::new(&test_config(&server)).unwrap();
        let session = client.new_session(serde_json::json!({})).await.unwrap();
        let err = session
            .wait_for_element("//missing", Duration::from_millis(600), "results container")
            .await
            .unwrap_err();

        match err {
            CheckerError::SourceUnavailable { stage, .. } => {
                assert_eq!(stage, "results container");
            }
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_protocol_error_carries_code() {
        let server = MockServer::start().await;
        mock_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc123/url"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "value": { "error": "unknown error", "message": "chrome crashed" }
            })))
            .mount(&server)
            .await;

        let client = WebDriverClient::new(&test_config(&server)).unwrap();
        let session = client.new_session(serde_json::json!({})).await.unwrap();
        let err = session.goto("https://kad.arbitr.ru/").await.unwrap_err();
        match err {
            CheckerError::WebDriver { details, .. } => {
                assert!(details.contains("chrome crashed"));
            }
            other => panic!("expected WebDriver error, got {other:?}"),
        }
    }
}

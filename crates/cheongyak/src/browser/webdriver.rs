use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tokio::time::Instant;

use super::{Browser, BrowserError, ElementHandle, Locator, Page};
use crate::config::BrowserConfig;

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(250);
const CHROME_ARGS: [&str; 4] = [
    "--headless=new",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
];

/// Starts headless Chrome sessions through a WebDriver endpoint (e.g. chromedriver).
#[derive(Debug, Clone)]
pub struct WebDriverBrowser {
    client: Client,
    endpoint: String,
}

impl WebDriverBrowser {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { client, endpoint }
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::new(config.webdriver_url.clone())
    }

    fn capabilities() -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": CHROME_ARGS }
                }
            }
        })
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError> {
        let request = self
            .client
            .post(format!("{}/session", self.endpoint))
            .json(&Self::capabilities());
        let value = send(request).await.map_err(|err| match err {
            err @ BrowserError::Session(_) => err,
            other => BrowserError::Session(other.to_string()),
        })?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Session("response carried no sessionId".to_string()))?;

        tracing::debug!(session_id, "webdriver session started");
        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            base: format!("{}/session/{}", self.endpoint, session_id),
        }))
    }
}

/// A live WebDriver session; every call maps to one protocol command.
#[derive(Debug)]
pub struct WebDriverSession {
    client: Client,
    base: String,
}

impl WebDriverSession {
    fn element_url(&self, element: &ElementHandle, command: &str) -> String {
        format!("{}/element/{}/{}", self.base, element.as_str(), command)
    }

    async fn read_value(&self, url: String) -> Result<Value, BrowserError> {
        send(self.client.get(url)).await
    }
}

#[async_trait]
impl Page for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let request = self
            .client
            .post(format!("{}/url", self.base))
            .json(&json!({ "url": url }));
        send(request)
            .await
            .map(|_| ())
            .map_err(|err| BrowserError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            })
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), BrowserError> {
        let started = Instant::now();
        loop {
            if !self.find_all(None, locator).await?.is_empty() {
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(BrowserError::Timeout {
                    locator: locator.to_string(),
                    waited,
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(timeout - waited)).await;
        }
    }

    async fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let url = match scope {
            Some(element) => self.element_url(element, "elements"),
            None => format!("{}/elements", self.base),
        };
        let request = self.client.post(url).json(&json!({
            "using": "css selector",
            "value": locator.to_css(),
        }));

        let value = send(request).await?;
        let entries = value
            .as_array()
            .ok_or_else(|| BrowserError::Protocol("element list was not an array".to_string()))?;

        entries
            .iter()
            .map(|entry| {
                entry
                    .get(ELEMENT_KEY)
                    .and_then(Value::as_str)
                    .map(|id| ElementHandle(id.to_string()))
                    .ok_or_else(|| {
                        BrowserError::Protocol(format!("malformed element reference: {entry}"))
                    })
            })
            .collect()
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        // Properties reflect live state (a select's chosen value, absolute hrefs);
        // fall back to the markup attribute when the property is unset.
        let property = self
            .read_value(self.element_url(element, &format!("property/{name}")))
            .await?;
        if let Some(value) = scalar_to_string(&property) {
            return Ok(Some(value));
        }

        let attribute = self
            .read_value(self.element_url(element, &format!("attribute/{name}")))
            .await?;
        Ok(scalar_to_string(&attribute))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        let value = self.read_value(self.element_url(element, "text")).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn execute(&self, script: &str) -> Result<(), BrowserError> {
        let request = self
            .client
            .post(format!("{}/execute/sync", self.base))
            .json(&json!({ "script": script, "args": [] }));
        send(request).await.map(|_| ())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        send(self.client.delete(self.base.as_str())).await.map(|_| ())
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Sends one command and unwraps the protocol's `{"value": ...}` envelope.
async fn send(request: RequestBuilder) -> Result<Value, BrowserError> {
    let response = request
        .send()
        .await
        .map_err(|err| BrowserError::Transport(err.to_string()))?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|err| BrowserError::Protocol(format!("invalid response body: {err}")))?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let code = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Err(protocol_error(code, status.as_u16(), message))
}

fn protocol_error(code: &str, status: u16, message: String) -> BrowserError {
    match code {
        "no such element" => BrowserError::NoSuchElement(message),
        "stale element reference" | "no such shadow root" => BrowserError::StaleElement(message),
        "javascript error" => BrowserError::Script(message),
        "session not created" | "invalid session id" => BrowserError::Session(message),
        _ => BrowserError::Protocol(format!("{code} (HTTP {status}): {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_map_to_variants() {
        assert!(matches!(
            protocol_error("no such element", 404, "gone".to_string()),
            BrowserError::NoSuchElement(message) if message == "gone"
        ));
        assert!(matches!(
            protocol_error("javascript error", 500, "fnSearch is not defined".to_string()),
            BrowserError::Script(_)
        ));
        assert!(matches!(
            protocol_error("unknown command", 404, String::new()),
            BrowserError::Protocol(message) if message.contains("HTTP 404")
        ));
    }

    #[test]
    fn scalar_values_become_strings() {
        assert_eq!(scalar_to_string(&json!("2025")), Some("2025".to_string()));
        assert_eq!(scalar_to_string(&json!(7)), Some("7".to_string()));
        assert_eq!(scalar_to_string(&Value::Null), None);
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let browser = WebDriverBrowser::new("http://127.0.0.1:9515/");
        assert_eq!(browser.endpoint, "http://127.0.0.1:9515");
    }
}

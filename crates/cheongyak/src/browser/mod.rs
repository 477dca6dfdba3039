//! Headless-browser capability used by the notice scrapers.
//!
//! Scrapers only see [`Page`]: navigate, wait for an element, query elements and read
//! their text or attributes. [`webdriver::WebDriverBrowser`] drives a real Chrome through
//! a WebDriver endpoint; [`fixture::FixtureBrowser`] serves parsed HTML from memory so
//! the extraction logic runs in tests without a browser process.

pub mod fixture;
pub mod webdriver;

use std::time::Duration;

use async_trait::async_trait;

pub use fixture::{FixtureBrowser, FixturePage};
pub use webdriver::{WebDriverBrowser, WebDriverSession};

/// How an element is located. All variants resolve to a CSS selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Css(String),
    Tag(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::Css(value.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Self::Tag(value.into())
    }

    pub fn to_css(&self) -> String {
        match self {
            Locator::Id(id) => format!("[id=\"{}\"]", id.replace('"', "\\\"")),
            Locator::Css(selector) => selector.clone(),
            Locator::Tag(tag) => tag.clone(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{id}"),
            Locator::Css(selector) => f.write_str(selector),
            Locator::Tag(tag) => write!(f, "<{tag}>"),
        }
    }
}

/// Opaque reference to an element of the page it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub(crate) String);

impl ElementHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("browser session could not be started: {0}")]
    Session(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("timed out after {waited:?} waiting for {locator}")]
    Timeout { locator: String, waited: Duration },
    #[error("no element matches {0}")]
    NoSuchElement(String),
    #[error("stale or unknown element handle {0}")]
    StaleElement(String),
    #[error("script execution failed: {0}")]
    Script(String),
    #[error("webdriver transport error: {0}")]
    Transport(String),
    #[error("webdriver protocol error: {0}")]
    Protocol(String),
}

/// One browser session's view of a document.
#[async_trait]
pub trait Page: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Waits until at least one element matches, or fails with [`BrowserError::Timeout`].
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), BrowserError>;

    /// Elements matching `locator`, searched below `scope` when given, else the document.
    async fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, BrowserError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Rendered text, one line per visual line.
    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError>;

    async fn execute(&self, script: &str) -> Result<(), BrowserError>;

    /// Ends the session. Called exactly once, whether extraction succeeded or not.
    async fn close(&self) -> Result<(), BrowserError>;

    async fn find(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<ElementHandle, BrowserError> {
        self.find_all(scope, locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::NoSuchElement(locator.to_string()))
    }
}

/// Starts browser sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError>;
}

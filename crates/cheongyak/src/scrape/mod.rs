//! Notice sources scraped through a [`Page`], one browser session per source.

pub mod applyhome;
pub mod myhome;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::browser::{Browser, BrowserError, Page};
use crate::notices::Notice;

pub use applyhome::ApplyhomeCalendar;
pub use myhome::MyhomeListing;

/// A site that can be walked into notices once its page is open.
#[async_trait]
pub trait NoticeSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, page: &dyn Page) -> Result<Vec<Notice>, ScrapeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("page markup is missing {0}")]
    Markup(String),
    #[error("calendar date {year}-{month}-{day} is not a valid date")]
    InvalidDate {
        year: String,
        month: String,
        day: String,
    },
}

/// A source that produced nothing because scraping it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: &'static str,
    pub reason: String,
}

/// Combined notices of every source, in source order, plus the sources that failed.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub notices: Vec<Notice>,
    pub failures: Vec<SourceFailure>,
}

impl ScrapeReport {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_sources(&self) -> Vec<&'static str> {
        self.failures.iter().map(|failure| failure.source).collect()
    }
}

/// Opens a session, extracts, and always closes the session afterwards. If the
/// returned future is dropped mid-extraction, the session is closed on a
/// spawned task instead.
pub async fn run_source(
    browser: &dyn Browser,
    source: &dyn NoticeSource,
) -> Result<Vec<Notice>, ScrapeError> {
    let page: Arc<dyn Page> = Arc::from(browser.open().await?);
    let mut guard = SessionGuard::new(source.name(), Arc::clone(&page));
    let outcome = source.extract(page.as_ref()).await;

    guard.disarm();
    if let Err(err) = page.close().await {
        warn!(source = source.name(), error = %err, "browser session did not close cleanly");
    }

    outcome
}

/// Closes the page from `Drop` unless disarmed first.
struct SessionGuard {
    source: &'static str,
    page: Option<Arc<dyn Page>>,
}

impl SessionGuard {
    fn new(source: &'static str, page: Arc<dyn Page>) -> Self {
        Self {
            source,
            page: Some(page),
        }
    }

    fn disarm(&mut self) {
        self.page = None;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        let source = self.source;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(source, "scrape cancelled; closing browser session in the background");
                runtime.spawn(async move {
                    if let Err(err) = page.close().await {
                        warn!(source, error = %err, "browser session did not close cleanly");
                    }
                });
            }
            Err(_) => warn!(source, "scrape cancelled outside a runtime; browser session left open"),
        }
    }
}

/// Runs every source one after another. A failing source contributes no notices
/// and is reported in [`ScrapeReport::failures`].
pub async fn collect_notices(
    browser: &dyn Browser,
    sources: &[Box<dyn NoticeSource>],
) -> ScrapeReport {
    let mut report = ScrapeReport::default();

    for source in sources {
        match run_source(browser, source.as_ref()).await {
            Ok(notices) => {
                info!(source = source.name(), count = notices.len(), "scraped notices");
                report.notices.extend(notices);
            }
            Err(err) => {
                warn!(
                    source = source.name(),
                    error = %err,
                    "scrape failed; continuing without source"
                );
                report.failures.push(SourceFailure {
                    source: source.name(),
                    reason: err.to_string(),
                });
            }
        }
    }

    report
}

async fn settle(delay: std::time::Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

use std::sync::Arc;

use tracing::info;

use crate::browser::{Browser, WebDriverBrowser};
use crate::config::{AppConfig, BrowserConfig};
use crate::feed::render_calendar;
use crate::notices::{filter_by_week, Notice, UserProfile, WeekClock, WeekRange};
use crate::scrape::{
    collect_notices, ApplyhomeCalendar, MyhomeListing, NoticeSource, SourceFailure,
};
use crate::strategy::{
    CompletionClient, CompletionError, OpenAiClient, Recommendation, StrategyComposer,
    StrategyError,
};

/// This week's notices from every source, with the sources that failed.
#[derive(Debug, Clone)]
pub struct WeeklyNotices {
    pub week: WeekRange,
    pub notices: Vec<Notice>,
    pub failures: Vec<SourceFailure>,
}

impl WeeklyNotices {
    pub fn failed_sources(&self) -> Vec<&'static str> {
        self.failures.iter().map(|failure| failure.source).collect()
    }
}

/// Outcome of a strategy request; `result` is the composer's verdict.
#[derive(Debug)]
pub struct WeeklyStrategy {
    pub week: WeekRange,
    pub failures: Vec<SourceFailure>,
    pub result: Result<Recommendation, StrategyError>,
}

/// Service composing the notice sources, the week clock, and the composer.
///
/// The calendar feed scrapes `feed_sources` when set, else the same sources as
/// the strategy path.
pub struct SubscriptionService<B, C> {
    browser: Arc<B>,
    sources: Vec<Box<dyn NoticeSource>>,
    feed_sources: Option<Vec<Box<dyn NoticeSource>>>,
    clock: WeekClock,
    composer: StrategyComposer<C>,
}

/// The two production sources in request order: calendar grid, then listing.
pub fn standard_sources(config: &BrowserConfig) -> Vec<Box<dyn NoticeSource>> {
    vec![
        Box::new(ApplyhomeCalendar::new(config.wait_timeout)),
        Box::new(MyhomeListing::new(config.wait_timeout).newlywed_only(config.newlywed_only)),
    ]
}

/// Sources behind the calendar feed; the listing is always newlywed-filtered.
pub fn feed_sources(config: &BrowserConfig) -> Vec<Box<dyn NoticeSource>> {
    vec![
        Box::new(ApplyhomeCalendar::new(config.wait_timeout)),
        Box::new(MyhomeListing::new(config.wait_timeout).newlywed_only(true)),
    ]
}

impl SubscriptionService<WebDriverBrowser, OpenAiClient> {
    pub fn from_config(config: &AppConfig) -> Result<Self, CompletionError> {
        let client = OpenAiClient::from_config(&config.llm)?;
        Ok(Self::new(
            Arc::new(WebDriverBrowser::from_config(&config.browser)),
            standard_sources(&config.browser),
            WeekClock::new(config.schedule.offset()),
            StrategyComposer::new(client),
        )
        .with_feed_sources(feed_sources(&config.browser)))
    }
}

impl<B, C> SubscriptionService<B, C>
where
    B: Browser + 'static,
    C: CompletionClient + 'static,
{
    pub fn new(
        browser: Arc<B>,
        sources: Vec<Box<dyn NoticeSource>>,
        clock: WeekClock,
        composer: StrategyComposer<C>,
    ) -> Self {
        Self {
            browser,
            sources,
            feed_sources: None,
            clock,
            composer,
        }
    }

    pub fn with_feed_sources(mut self, sources: Vec<Box<dyn NoticeSource>>) -> Self {
        self.feed_sources = Some(sources);
        self
    }

    /// Replaces the week clock, e.g. to replay a past week.
    pub fn with_clock(mut self, clock: WeekClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> WeekClock {
        self.clock
    }

    pub fn composer(&self) -> &StrategyComposer<C> {
        &self.composer
    }

    /// Scrapes every source in order and keeps the notices of the current week.
    pub async fn weekly_notices(&self) -> WeeklyNotices {
        self.collect_week(&self.sources).await
    }

    async fn collect_week(&self, sources: &[Box<dyn NoticeSource>]) -> WeeklyNotices {
        let week = self.clock.current_week();
        let report = collect_notices(self.browser.as_ref(), sources).await;
        let scraped = report.notices.len();
        let notices = filter_by_week(report.notices, &week);

        info!(
            week_start = %week.start,
            week_end = %week.end,
            scraped,
            kept = notices.len(),
            failed = report.failures.len(),
            "collected weekly notices"
        );

        WeeklyNotices {
            week,
            notices,
            failures: report.failures,
        }
    }

    /// The current week as an iCalendar document.
    pub async fn calendar(&self) -> (String, WeeklyNotices) {
        let sources = self.feed_sources.as_deref().unwrap_or(self.sources.as_slice());
        let weekly = self.collect_week(sources).await;
        (render_calendar(&weekly.notices), weekly)
    }

    /// Ranks the current week's notices for `profile`.
    pub async fn strategy(&self, profile: &UserProfile) -> WeeklyStrategy {
        let weekly = self.weekly_notices().await;
        let result = self
            .composer
            .compose(profile, &weekly.week, &weekly.notices)
            .await;

        WeeklyStrategy {
            week: weekly.week,
            failures: weekly.failures,
            result,
        }
    }
}

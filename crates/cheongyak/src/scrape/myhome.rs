use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;

use super::{settle, NoticeSource, ScrapeError};
use crate::browser::{Locator, Page};
use crate::notices::Notice;

pub const MYHOME_NOTICES_URL: &str =
    "https://www.myhome.go.kr/hws/portal/sch/selectRsdtRcritNtcView.do";

const SEARCH_FORM_ID: &str = "searchTyId";
const LISTING_ROWS: &str = ".tb-list.list-announce tbody tr";
const SEARCH_SCRIPT: &str = "fnSearch('1')";
const NEWLYWED_FILTER_SCRIPT: &str =
    "document.querySelector('input[name=searchTyId][value=FIXES100002]').click()";
const NEWLYWED_PREFIX: &str = "[신혼부부]";

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("date pattern compiles"))
}

/// The rental recruitment listing: one notice per table row that carries a date.
/// Titles are always tagged `[신혼부부]`; [`MyhomeListing::newlywed_only`] also
/// clicks the site's newlywed filter before searching.
#[derive(Debug, Clone)]
pub struct MyhomeListing {
    url: String,
    wait_timeout: Duration,
    settle: Duration,
    newlywed_only: bool,
}

impl Default for MyhomeListing {
    fn default() -> Self {
        Self {
            url: MYHOME_NOTICES_URL.to_string(),
            wait_timeout: Duration::from_secs(10),
            settle: Duration::from_secs(1),
            newlywed_only: false,
        }
    }
}

impl MyhomeListing {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            wait_timeout,
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Restricts the search to newlywed-couple notices.
    pub fn newlywed_only(mut self, enabled: bool) -> Self {
        self.newlywed_only = enabled;
        self
    }

}

#[async_trait]
impl NoticeSource for MyhomeListing {
    fn name(&self) -> &'static str {
        "myhome"
    }

    async fn extract(&self, page: &dyn Page) -> Result<Vec<Notice>, ScrapeError> {
        page.navigate(&self.url).await?;
        page.wait_for(&Locator::id(SEARCH_FORM_ID), self.wait_timeout).await?;
        if self.newlywed_only {
            page.execute(NEWLYWED_FILTER_SCRIPT).await?;
        }
        page.execute(SEARCH_SCRIPT).await?;

        let rows = Locator::css(LISTING_ROWS);
        page.wait_for(&rows, self.wait_timeout).await?;
        settle(self.settle).await;

        let mut notices = Vec::new();
        for row in page.find_all(None, &rows).await? {
            let columns = page.find_all(Some(&row), &Locator::tag("td")).await?;
            let Some(second) = columns.get(1) else {
                continue;
            };

            let text = page.text(second).await?;
            match parse_listing_cell(&text) {
                Some(notice) => notices.push(notice),
                None => tracing::debug!(row = %text.replace('\n', " | "), "skipping listing row"),
            }
        }

        Ok(notices)
    }
}

/// Reads a listing cell laid out as region, title, then detail lines. The date
/// is the first detail line that begins with `YYYY-MM-DD`; a row whose first
/// such line is not a real date is skipped.
pub(crate) fn parse_listing_cell(text: &str) -> Option<Notice> {
    let lines: Vec<&str> = text.trim().lines().map(str::trim).collect();
    if lines.len() < 2 {
        return None;
    }

    let region = lines[0];
    let title = format!("{NEWLYWED_PREFIX} {}", lines[1]);
    let date = lines[2..]
        .iter()
        .find_map(|line| date_pattern().find(line))
        .and_then(|found| NaiveDate::parse_from_str(found.as_str(), "%Y-%m-%d").ok())?;

    Some(Notice::single_day(title, region, date))
}

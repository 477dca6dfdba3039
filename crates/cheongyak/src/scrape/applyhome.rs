use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{settle, NoticeSource, ScrapeError};
use crate::browser::{BrowserError, Locator, Page};
use crate::notices::{Notice, NATIONWIDE};

pub const APPLYHOME_CALENDAR_URL: &str =
    "https://www.applyhome.co.kr/ai/aib/selectSubscrptCalenderView.do";
pub const APPLYHOME_HOME_URL: &str = "https://www.applyhome.co.kr";

const CALENDAR_TABLE_ID: &str = "calTable";
const YEAR_SELECT_ID: &str = "sel_year";
const ACTIVE_MONTH: &str = ".cal_bottom .active";
const DAY_CELLS: &str = "#calTable tbody td";

/// The national subscription calendar grid: one notice per link in a day cell.
#[derive(Debug, Clone)]
pub struct ApplyhomeCalendar {
    url: String,
    wait_timeout: Duration,
    settle: Duration,
}

impl Default for ApplyhomeCalendar {
    fn default() -> Self {
        Self {
            url: APPLYHOME_CALENDAR_URL.to_string(),
            wait_timeout: Duration::from_secs(10),
            settle: Duration::from_secs(2),
        }
    }
}

impl ApplyhomeCalendar {
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

    async fn required_attribute(
        page: &dyn Page,
        locator: Locator,
        name: &str,
    ) -> Result<String, ScrapeError> {
        let element = page.find(None, &locator).await?;
        page.attribute(&element, name)
            .await?
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ScrapeError::Markup(format!("{name} of {locator}")))
    }
}

#[async_trait]
impl NoticeSource for ApplyhomeCalendar {
    fn name(&self) -> &'static str {
        "applyhome"
    }

    async fn extract(&self, page: &dyn Page) -> Result<Vec<Notice>, ScrapeError> {
        page.navigate(&self.url).await?;
        page.wait_for(&Locator::id(CALENDAR_TABLE_ID), self.wait_timeout).await?;
        settle(self.settle).await;

        let cells = page.find_all(None, &Locator::css(DAY_CELLS)).await?;
        let year = Self::required_attribute(page, Locator::id(YEAR_SELECT_ID), "value").await?;
        let month = Self::required_attribute(page, Locator::css(ACTIVE_MONTH), "data-val").await?;

        let mut notices = Vec::new();
        for cell in cells {
            let Some(day) = page
                .attribute(&cell, "data-ids")
                .await?
                .filter(|day| !day.trim().is_empty())
            else {
                continue;
            };

            let links = page.find_all(Some(&cell), &Locator::tag("a")).await?;
            if links.is_empty() {
                continue;
            }

            let date = calendar_date(&year, &month, &day)?;
            for link in links {
                let span = match page.find(Some(&link), &Locator::tag("span")).await {
                    Ok(span) => span,
                    Err(BrowserError::NoSuchElement(_)) => continue,
                    Err(err) => return Err(err.into()),
                };
                let title = page.text(&span).await?.trim().to_string();
                let url = page
                    .attribute(&link, "href")
                    .await?
                    .filter(|href| !href.trim().is_empty())
                    .unwrap_or_else(|| APPLYHOME_HOME_URL.to_string());

                notices.push(Notice::single_day(title, NATIONWIDE, date).with_url(url));
            }
        }

        Ok(notices)
    }
}

/// Builds the date of a grid cell from the page's year/month selectors and the
/// cell's day-of-month.
pub(crate) fn calendar_date(year: &str, month: &str, day: &str) -> Result<NaiveDate, ScrapeError> {
    let invalid = || ScrapeError::InvalidDate {
        year: year.to_string(),
        month: month.to_string(),
        day: day.to_string(),
    };

    let y = year.trim().parse::<i32>().map_err(|_| invalid())?;
    let m = month.trim().parse::<u32>().map_err(|_| invalid())?;
    let d = day.trim().parse::<u32>().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid)
}

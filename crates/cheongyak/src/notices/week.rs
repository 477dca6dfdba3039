use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;

use super::domain::Notice;

/// Inclusive Monday–Sunday range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    /// The week that contains `date`; a Monday starts its own week.
    pub fn containing(date: NaiveDate) -> Self {
        let start = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Decides what "today" is for the week filter.
///
/// Every caller shares one policy: a fixed UTC offset (KST, +09:00, unless
/// configured otherwise). A clock can be pinned to a date for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct WeekClock {
    offset: FixedOffset,
    pinned: Option<NaiveDate>,
}

impl WeekClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            pinned: None,
        }
    }

    pub fn pinned(date: NaiveDate) -> Self {
        Self {
            offset: Utc.fix(),
            pinned: Some(date),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.pinned
            .unwrap_or_else(|| Utc::now().with_timezone(&self.offset).date_naive())
    }

    pub fn current_week(&self) -> WeekRange {
        WeekRange::containing(self.today())
    }
}

/// Keeps the notices whose start date falls inside `week`, preserving order.
pub fn filter_by_week(notices: Vec<Notice>, week: &WeekRange) -> Vec<Notice> {
    notices
        .into_iter()
        .filter(|notice| week.contains(notice.start_date))
        .collect()
}

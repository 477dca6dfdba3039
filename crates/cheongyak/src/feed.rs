//! iCalendar (RFC 5545) rendering of weekly notices.

use chrono::{DateTime, Duration, Utc};
use icalendar::{Calendar, Component, Event, EventLike};
use uuid::Uuid;

use crate::notices::Notice;

pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
pub const EVENT_DESCRIPTION: &str = "청약 일정입니다.";

/// Renders one all-day event per notice. Each render issues fresh UIDs, so the
/// same notices produce distinct event identifiers across calls.
pub fn render_calendar(notices: &[Notice]) -> String {
    render_calendar_at(notices, Utc::now())
}

pub fn render_calendar_at(notices: &[Notice], stamp: DateTime<Utc>) -> String {
    let mut calendar = Calendar::new();
    for notice in notices {
        calendar.push(notice_event(notice, stamp));
    }
    calendar.done().to_string()
}

fn notice_event(notice: &Notice, stamp: DateTime<Utc>) -> Event {
    let mut event = Event::new();
    event
        .uid(&format!("{}@cheongyak", Uuid::new_v4()))
        .timestamp(stamp)
        .starts(notice.start_date)
        .ends(notice.start_date + Duration::days(1))
        .summary(notice.display_title())
        .description(EVENT_DESCRIPTION);
    if let Some(url) = notice.url.as_deref().filter(|url| !url.is_empty()) {
        event.add_property("URL", url);
    }
    event.done()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notices::NATIONWIDE;
    use chrono::{NaiveDate, TimeZone};

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()
    }

    fn unfold(document: &str) -> String {
        document.replace("\r\n ", "").replace("\r\n\t", "")
    }

    #[test]
    fn empty_list_is_a_valid_empty_calendar() {
        let document = render_calendar_at(&[], stamp());

        assert!(document.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(document.contains("VERSION:2.0\r\n"));
        assert!(document.ends_with("END:VCALENDAR\r\n"));
        assert!(!document.contains("BEGIN:VEVENT"));
    }

    #[test]
    fn single_notice_is_one_all_day_event() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let document = render_calendar_at(&[Notice::single_day("A", NATIONWIDE, day)], stamp());

        assert_eq!(document.matches("BEGIN:VEVENT").count(), 1);
        assert!(document.contains("SUMMARY:A\r\n"));
        assert!(document.contains("DTSTART;VALUE=DATE:20250106\r\n"));
        assert!(document.contains("DTEND;VALUE=DATE:20250107\r\n"));
        assert!(document.contains("DTSTAMP:20250106T000000Z\r\n"));
        assert!(document.contains("DESCRIPTION:청약 일정입니다.\r\n"));
        assert!(!document.contains("URL:"));
    }

    #[test]
    fn uids_differ_between_renders() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let notices = [Notice::single_day("A", NATIONWIDE, day)];
        let uid = |doc: &str| {
            doc.lines()
                .find(|line| line.starts_with("UID:"))
                .map(str::to_string)
        };
        assert_ne!(
            uid(&render_calendar_at(&notices, stamp())),
            uid(&render_calendar_at(&notices, stamp()))
        );
    }

    #[test]
    fn empty_titles_use_the_unknown_name() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let document = render_calendar_at(&[Notice::single_day("", NATIONWIDE, day)], stamp());

        assert!(document.contains("SUMMARY:이름미상\r\n"));
    }

    #[test]
    fn long_korean_titles_fold_within_line_limit() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let title = "힐스테이트 래미안 자이 ".repeat(6);
        let notice = Notice::single_day(title.trim(), NATIONWIDE, day)
            .with_url("https://www.applyhome.co.kr/detail?id=1");
        let document = render_calendar_at(&[notice], stamp());

        assert!(document.split("\r\n").all(|line| line.len() <= 75));
        let unfolded = unfold(&document);
        assert!(unfolded.contains(&format!("SUMMARY:{}", title.trim())));
        assert!(unfolded.contains("URL:https://www.applyhome.co.kr/detail?id=1"));
    }
}

use super::common::*;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use crate::scrape::MyhomeListing;
use crate::strategy::StrategyError;

const ANSWER: &str = r#"{"추천 지역":["서울특별시"],"청약 목록":[{"이름":"행복주택 C","접수일":"2025-01-08","발표일":"","분양가":null}]}"#;

#[tokio::test]
async fn weekly_notices_keep_source_order_and_drop_other_weeks() {
    let browser = working_browser();
    let service = build_service(browser.clone(), CannedClient::failing());

    let weekly = service.weekly_notices().await;

    let titles: Vec<&str> = weekly.notices.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["래미안 A", "[신혼부부] 행복주택 C"]);
    assert_eq!(weekly.week.start, NaiveDate::from_ymd_opt(2025, 1, 6).expect("date"));
    assert_eq!(weekly.week.end, NaiveDate::from_ymd_opt(2025, 1, 12).expect("date"));
    assert!(weekly.failures.is_empty());
    assert_eq!(browser.sessions_opened(), 2);
    assert_eq!(browser.sessions_closed(), 2);
}

#[tokio::test]
async fn failing_source_is_reported_and_others_still_contribute() {
    let browser = degraded_browser();
    let service = build_service(browser.clone(), CannedClient::failing());

    let weekly = service.weekly_notices().await;

    assert_eq!(weekly.failed_sources(), vec!["applyhome"]);
    assert_eq!(weekly.notices.len(), 1);
    assert_eq!(weekly.notices[0].region, "서울특별시");
    assert_eq!(browser.sessions_closed(), 2);
}

#[tokio::test]
async fn calendar_contains_only_this_weeks_events() {
    let service = build_service(working_browser(), CannedClient::failing());

    let (body, weekly) = service.calendar().await;

    assert_eq!(body.matches("BEGIN:VEVENT").count(), weekly.notices.len());
    assert!(body.contains("SUMMARY:래미안 A\r\n"));
    assert!(!body.contains("자이 B"));
    assert!(body.contains("DTSTART;VALUE=DATE:20250108\r\n"));
}

#[tokio::test]
async fn strategy_sends_week_and_notices_to_the_model() {
    let service = build_service(working_browser(), CannedClient::answering(ANSWER));

    let outcome = service.strategy(&profile()).await;

    let recommendation = outcome.result.expect("recommendation");
    assert_eq!(recommendation.regions, vec!["서울특별시"]);
    assert_eq!(recommendation.notices[0].announce_date, None);

    let prompts = service.composer().client().prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("기간: 2025-01-06 ~ 2025-01-12"));
    assert!(prompts[0].contains("행복주택 C"));
    assert!(!prompts[0].contains("자이 B"));
}

#[tokio::test]
async fn strategy_with_no_model_is_a_completion_error() {
    let service = build_service(working_browser(), CannedClient::failing());

    let outcome = service.strategy(&profile()).await;

    assert!(matches!(outcome.result, Err(StrategyError::Completion(_))));
    assert_eq!(service.composer().client().prompts().len(), 2);
}

#[tokio::test]
async fn calendar_scrapes_its_own_sources_when_configured() {
    let browser = working_browser();
    let service = Arc::try_unwrap(build_service(browser.clone(), CannedClient::failing()))
        .unwrap_or_else(|_| panic!("service is not shared yet"))
        .with_feed_sources(vec![Box::new(
            MyhomeListing::default()
                .with_settle(Duration::ZERO)
                .newlywed_only(true),
        )]);

    let (body, weekly) = service.calendar().await;

    assert_eq!(weekly.notices.len(), 1);
    assert!(body.contains("SUMMARY:[신혼부부] 행복주택 C\r\n"));
    assert!(!body.contains("래미안 A"));
    assert!(browser.executed_scripts()[0].contains("FIXES100002"));

    let strategy_week = service.weekly_notices().await;
    assert_eq!(strategy_week.notices.len(), 2);
}

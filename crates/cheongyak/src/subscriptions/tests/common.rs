use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::browser::FixtureBrowser;
use crate::notices::{UserProfile, WeekClock};
use crate::scrape::applyhome::APPLYHOME_CALENDAR_URL;
use crate::scrape::myhome::MYHOME_NOTICES_URL;
use crate::scrape::{ApplyhomeCalendar, MyhomeListing, NoticeSource};
use crate::strategy::{CompletionClient, CompletionError, StrategyComposer};
use crate::subscriptions::SubscriptionService;

pub(super) const CALENDAR_PAGE: &str = r#"<html><body>
    <select id="sel_year"><option value="2025" selected>2025</option></select>
    <ul class="cal_bottom"><li class="active" data-val="1">1</li></ul>
    <table id="calTable"><tbody><tr>
      <td data-ids="6"><a href="https://www.applyhome.co.kr/detail?id=1"><span>래미안 A</span></a></td>
      <td data-ids="20"><a href="https://www.applyhome.co.kr/detail?id=2"><span>자이 B</span></a></td>
    </tr></tbody></table>
    </body></html>"#;

pub(super) const LISTING_FORM: &str =
    r#"<html><body><div id="searchTyId"></div></body></html>"#;

pub(super) const LISTING_RESULTS: &str = r#"<html><body>
    <table class="tb-list list-announce"><tbody>
      <tr><td>1</td><td><p>서울특별시</p><p>행복주택 C</p><p>2025-01-08</p></td></tr>
    </tbody></table></body></html>"#;

pub(super) fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 8).expect("valid date")
}

pub(super) fn profile() -> UserProfile {
    UserProfile {
        is_homeless: true,
        is_married: true,
        marriage_years: 3,
        children_count: 1,
        is_householder: true,
        has_account: true,
        has_house_history: false,
    }
}

pub(super) fn working_browser() -> FixtureBrowser {
    FixtureBrowser::new()
        .with_page(APPLYHOME_CALENDAR_URL, CALENDAR_PAGE)
        .with_page(MYHOME_NOTICES_URL, LISTING_FORM)
        .with_script_result(MYHOME_NOTICES_URL, "fnSearch('1')", LISTING_RESULTS)
}

/// Listing works, calendar grid never renders.
pub(super) fn degraded_browser() -> FixtureBrowser {
    FixtureBrowser::new()
        .with_page(APPLYHOME_CALENDAR_URL, "<html><body>점검 중</body></html>")
        .with_page(MYHOME_NOTICES_URL, LISTING_FORM)
        .with_script_result(MYHOME_NOTICES_URL, "fnSearch('1')", LISTING_RESULTS)
}

pub(super) fn sources() -> Vec<Box<dyn NoticeSource>> {
    vec![
        Box::new(ApplyhomeCalendar::default().with_settle(Duration::ZERO)),
        Box::new(MyhomeListing::default().with_settle(Duration::ZERO)),
    ]
}

/// Answers every prompt with the same text and remembers the prompts.
#[derive(Default)]
pub(super) struct CannedClient {
    answer: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl CannedClient {
    pub(super) fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing() -> Self {
        Self::default()
    }

    pub(super) fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    fn respond(&self, prompt: &str) -> Result<String, CompletionError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.answer.clone().ok_or(CompletionError::MissingApiKey)
    }
}

#[async_trait]
impl CompletionClient for CannedClient {
    async fn structured(&self, prompt: &str, _schema: &Value) -> Result<String, CompletionError> {
        self.respond(prompt)
    }

    async fn chat(&self, prompt: &str) -> Result<String, CompletionError> {
        self.respond(prompt)
    }
}

pub(super) fn build_service(
    browser: FixtureBrowser,
    client: CannedClient,
) -> Arc<SubscriptionService<FixtureBrowser, CannedClient>> {
    Arc::new(SubscriptionService::new(
        Arc::new(browser),
        sources(),
        WeekClock::pinned(wednesday()),
        StrategyComposer::new(client),
    ))
}

pub(super) async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub(super) async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder used when a source page carries no title.
pub const UNKNOWN_TITLE: &str = "이름미상";
/// Placeholder used when a source page carries no region.
pub const UNKNOWN_REGION: &str = "지역미상";
/// Region assigned to every entry of the national subscription calendar.
pub const NATIONWIDE: &str = "전국";
/// Neither site publishes an income ceiling in its listing markup.
pub const INCOME_LIMIT_PLACEHOLDER: u32 = 99_999;

/// A single housing-subscription announcement scraped for the current request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NoticeRecord")]
pub struct Notice {
    pub title: String,
    pub region: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub income_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announce_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub needs_homeless: bool,
    pub needs_householder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_marriage_years: Option<u32>,
    pub children_scoring: bool,
    pub types: Vec<String>,
}

impl Notice {
    /// A notice whose application window is a single day, as both sites list them.
    pub fn single_day(
        title: impl Into<String>,
        region: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            title: title.into(),
            region: region.into(),
            start_date: date,
            end_date: date,
            url: None,
            income_limit: INCOME_LIMIT_PLACEHOLDER,
            announce_date: None,
            price: None,
            needs_homeless: false,
            needs_householder: false,
            max_marriage_years: None,
            children_scoring: false,
            types: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Title with the unknown-title sentinel substituted for blanks.
    pub fn display_title(&self) -> &str {
        non_blank(&self.title).unwrap_or(UNKNOWN_TITLE)
    }

    /// Region with the unknown-region sentinel substituted for blanks.
    pub fn display_region(&self) -> &str {
        non_blank(&self.region).unwrap_or(UNKNOWN_REGION)
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Eligibility answers submitted with a strategy request.
///
/// Only field types are checked; contradictory answers such as a positive
/// `marriageYears` with `isMarried == false` are accepted as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub is_homeless: bool,
    pub is_married: bool,
    pub marriage_years: i32,
    pub children_count: i32,
    pub is_householder: bool,
    pub has_account: bool,
    pub has_house_history: bool,
}

/// Wire shape accepted for notices, including the Korean keys some feeds use.
#[derive(Debug, Deserialize)]
struct NoticeRecord {
    #[serde(default, alias = "이름")]
    title: Option<String>,
    #[serde(default, alias = "지역")]
    region: Option<String>,
    #[serde(default, alias = "접수시작")]
    start_date: Option<NaiveDate>,
    #[serde(default, alias = "접수마감")]
    end_date: Option<NaiveDate>,
    #[serde(default, rename = "접수일")]
    application_date: Option<NaiveDate>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    income_limit: Option<u32>,
    #[serde(default, alias = "발표일")]
    announce_date: Option<NaiveDate>,
    #[serde(default)]
    price: Option<serde_json::Value>,
    #[serde(default)]
    needs_homeless: bool,
    #[serde(default)]
    needs_householder: bool,
    #[serde(default)]
    max_marriage_years: Option<u32>,
    #[serde(default)]
    children_scoring: bool,
    #[serde(default, alias = "공급유형")]
    types: Option<SupplyTypes>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SupplyTypes {
    List(Vec<String>),
    Joined(String),
}

impl SupplyTypes {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            SupplyTypes::List(items) => items,
            SupplyTypes::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

impl TryFrom<NoticeRecord> for Notice {
    type Error = String;

    fn try_from(record: NoticeRecord) -> Result<Self, Self::Error> {
        let start_date = record
            .start_date
            .or(record.application_date)
            .ok_or_else(|| "notice is missing a start date".to_string())?;
        let end_date = record
            .end_date
            .or(record.application_date)
            .unwrap_or(start_date);

        Ok(Self {
            title: record.title.unwrap_or_default(),
            region: record.region.unwrap_or_default(),
            start_date,
            end_date,
            url: record.url,
            income_limit: record.income_limit.unwrap_or(INCOME_LIMIT_PLACEHOLDER),
            announce_date: record.announce_date,
            price: record.price.as_ref().and_then(serde_json::Value::as_f64),
            needs_homeless: record.needs_homeless,
            needs_householder: record.needs_householder,
            max_marriage_years: record.max_marriage_years,
            children_scoring: record.children_scoring,
            types: record.types.map(SupplyTypes::into_vec).unwrap_or_default(),
        })
    }
}

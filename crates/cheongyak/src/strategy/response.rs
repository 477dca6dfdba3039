use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StrategyError;

const REGIONS_KEY: &str = "추천 지역";
const NOTICES_KEY: &str = "청약 목록";

/// The model's ranked answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "추천 지역")]
    pub regions: Vec<String>,
    #[serde(rename = "청약 목록")]
    pub notices: Vec<RecommendedNotice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedNotice {
    #[serde(rename = "이름")]
    pub name: String,
    #[serde(rename = "접수일")]
    pub application_date: String,
    #[serde(rename = "발표일")]
    pub announce_date: Option<String>,
    #[serde(rename = "분양가")]
    pub price: Option<f64>,
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("```json|```").expect("fence pattern compiles"))
}

fn json_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)(\{.*\}|\[.*\])").expect("block pattern compiles"))
}

/// Drops markdown code fences and surrounding whitespace.
pub fn strip_fences(text: &str) -> String {
    fence_pattern().replace_all(text, "").trim().to_string()
}

/// Parses model output into a [`Recommendation`].
///
/// The whole cleaned text is tried first; if it is not a usable JSON document,
/// the first brace or bracket block is extracted and tried instead.
pub fn parse_recommendation(text: &str) -> Result<Recommendation, StrategyError> {
    let cleaned = strip_fences(text);

    if let Some(recommendation) = parse_value(&cleaned) {
        return Ok(recommendation);
    }

    let recovered = json_block_pattern()
        .find(&cleaned)
        .and_then(|block| parse_value(block.as_str()));
    match recovered {
        Some(recommendation) => {
            tracing::debug!("recovered recommendation from mixed model output");
            Ok(recommendation)
        }
        None => Err(StrategyError::Parse { raw: cleaned }),
    }
}

fn parse_value(text: &str) -> Option<Recommendation> {
    serde_json::from_str::<Value>(text).ok().and_then(shape)
}

/// Fills in what the model left out: missing sections become empty lists, and
/// missing, empty or `"null"` announce dates and prices become `null`. A bare
/// array is read as the notice list.
fn shape(value: Value) -> Option<Recommendation> {
    match value {
        Value::Array(items) => Some(Recommendation {
            regions: Vec::new(),
            notices: shape_notices(items),
        }),
        Value::Object(mut object) => {
            let regions = match object.remove(REGIONS_KEY) {
                Some(Value::Array(regions)) => regions.iter().filter_map(text_of).collect(),
                _ => Vec::new(),
            };
            let notices = match object.remove(NOTICES_KEY) {
                Some(Value::Array(items)) => shape_notices(items),
                _ => Vec::new(),
            };
            Some(Recommendation { regions, notices })
        }
        _ => None,
    }
}

fn shape_notices(items: Vec<Value>) -> Vec<RecommendedNotice> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(shape_notice(&fields)),
            _ => None,
        })
        .collect()
}

fn shape_notice(fields: &Map<String, Value>) -> RecommendedNotice {
    RecommendedNotice {
        name: fields.get("이름").and_then(text_of).unwrap_or_default(),
        application_date: fields.get("접수일").and_then(text_of).unwrap_or_default(),
        announce_date: fields
            .get("발표일")
            .and_then(text_of)
            .filter(|value| !is_null_text(value)),
        price: fields.get("분양가").and_then(price_of),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn price_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if !is_null_text(text) => text.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn is_null_text(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "null"
}

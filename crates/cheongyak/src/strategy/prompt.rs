use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use crate::notices::{Notice, UserProfile, WeekRange};

/// Name under which the response schema is registered with the model.
pub const SCHEMA_NAME: &str = "HousingRecommendation";

/// A notice as the model sees it. Absent values are sent as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptNotice<'a> {
    #[serde(rename = "이름")]
    pub name: &'a str,
    #[serde(rename = "접수시작")]
    pub start_date: NaiveDate,
    #[serde(rename = "접수마감")]
    pub end_date: NaiveDate,
    #[serde(rename = "발표일")]
    pub announce_date: Option<NaiveDate>,
    #[serde(rename = "분양가")]
    pub price: Option<f64>,
    #[serde(rename = "지역")]
    pub region: &'a str,
    #[serde(rename = "공급유형")]
    pub types: &'a [String],
    #[serde(rename = "무주택필수")]
    pub needs_homeless: bool,
    #[serde(rename = "세대주필수")]
    pub needs_householder: bool,
    #[serde(rename = "혼인연한최대")]
    pub max_marriage_years: Option<u32>,
    #[serde(rename = "자녀가점")]
    pub children_scoring: bool,
}

impl<'a> From<&'a Notice> for PromptNotice<'a> {
    fn from(notice: &'a Notice) -> Self {
        Self {
            name: notice.display_title(),
            start_date: notice.start_date,
            end_date: notice.end_date,
            announce_date: notice.announce_date,
            price: notice.price.filter(|price| price.is_finite()),
            region: notice.display_region(),
            types: &notice.types,
            needs_homeless: notice.needs_homeless,
            needs_householder: notice.needs_householder,
            max_marriage_years: notice.max_marriage_years,
            children_scoring: notice.children_scoring,
        }
    }
}

pub fn normalize(notices: &[Notice]) -> Vec<PromptNotice<'_>> {
    notices.iter().map(PromptNotice::from).collect()
}

/// Builds the ranking instructions for one applicant and one week of notices.
pub fn build_prompt(profile: &UserProfile, week: &WeekRange, notices: &[Notice]) -> String {
    let applicant = serde_json::to_string(profile).unwrap_or_else(|_| "{}".to_string());
    let listing = serde_json::to_string(&normalize(notices)).unwrap_or_else(|_| "[]".to_string());

    let mut prompt = String::new();
    prompt.push_str(
        "다음은 청약 지원자 정보와 이번 주 청약 공고입니다. 규칙에 따라 필터링/정렬하고 JSON만 출력하세요.\n\n",
    );
    prompt.push_str(&format!("지원자: {applicant}\n"));
    prompt.push_str(&format!("기간: {} ~ {}\n", week.start, week.end));
    prompt.push_str(&format!("공고목록: {listing}\n\n"));
    prompt.push_str(concat!(
        "요구사항:\n",
        "1) 필터:\n",
        "- 무주택필수==true 이면 isHomeless==true 인 경우만\n",
        "- 세대주필수==true 이면 isHouseholder==true 인 경우만\n",
        "- 혼인연한최대가 있으면 marriageYears ≤ 혼인연한최대\n",
        "- 공급유형에 '신혼부부특공' 포함 시 isMarried==true 권장(미충족이면 제외)\n",
        "- 접수 기간(접수시작~접수마감)이 기간과 겹치는 공고만\n",
        "2) 정렬 우선순위: (a) 사용자와 맞는 공급유형 우선 → (b) 접수마감 임박 순 → (c) 분양가 낮은 순(null은 뒤)\n",
        "3) 추천 지역: 최종 선정 공고의 지역 상위 3곳(빈도 순, 동률 시 평균 분양가 낮은 순)\n",
        "4) 출력 스키마(오직 JSON):\n",
        "{\n",
        "  \"추천 지역\": string[],\n",
        "  \"청약 목록\": [{\"이름\": string, \"접수일\": string, \"발표일\": string|null, \"분양가\": number|null}]\n",
        "}\n",
        "5) 값이 없으면 발표일/분양가는 null로.\n",
        "오직 JSON만 출력하세요.",
    ));
    prompt
}

/// Strict JSON schema of the expected answer.
pub fn recommendation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "추천 지역": { "type": "array", "items": { "type": "string" } },
            "청약 목록": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "이름": { "type": "string" },
                        "접수일": { "type": "string" },
                        "발표일": { "type": ["string", "null"] },
                        "분양가": { "type": ["number", "null"] }
                    },
                    "required": ["이름", "접수일", "발표일", "분양가"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["추천 지역", "청약 목록"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notices::{NATIONWIDE, UNKNOWN_TITLE};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn profile() -> UserProfile {
        UserProfile {
            is_homeless: true,
            is_married: true,
            marriage_years: 2,
            children_count: 1,
            is_householder: true,
            has_account: true,
            has_house_history: false,
        }
    }

    #[test]
    fn normalized_notice_uses_korean_keys_and_nulls() {
        let notice = Notice::single_day(" ", NATIONWIDE, date(2025, 1, 6));
        let value = serde_json::to_value(normalize(std::slice::from_ref(&notice))).expect("json");

        assert_eq!(
            value,
            json!([{
                "이름": UNKNOWN_TITLE,
                "접수시작": "2025-01-06",
                "접수마감": "2025-01-06",
                "발표일": null,
                "분양가": null,
                "지역": "전국",
                "공급유형": [],
                "무주택필수": false,
                "세대주필수": false,
                "혼인연한최대": null,
                "자녀가점": false
            }])
        );
    }

    #[test]
    fn prompt_embeds_profile_week_and_notices() {
        let week = WeekRange::containing(date(2025, 1, 8));
        let notices = vec![Notice::single_day("래미안 A", NATIONWIDE, date(2025, 1, 6))];
        let prompt = build_prompt(&profile(), &week, &notices);

        assert!(prompt.contains("기간: 2025-01-06 ~ 2025-01-12"));
        assert!(prompt.contains("\"isHomeless\":true"));
        assert!(prompt.contains("\"marriageYears\":2"));
        assert!(prompt.contains("\"이름\":\"래미안 A\""));
        assert!(prompt.ends_with("오직 JSON만 출력하세요."));
    }

    #[test]
    fn schema_requires_both_sections() {
        let schema = recommendation_schema();
        assert_eq!(schema["required"], json!(["추천 지역", "청약 목록"]));
        assert_eq!(schema["additionalProperties"], json!(false));
    }
}

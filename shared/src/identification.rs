//! Food identification prompt and response grammar
//!
//! The vision model is asked for exactly three labelled lines:
//!
//! ```text
//! 음식: <candidate or 해당 사항 없음>
//! 위험도: <안전|주의|위험> - <rationale>
//! 칼로리: <free-text estimate>
//! ```
//!
//! Each line follows `[noise]* label ':' value`. Noise is whatever models like
//! to prepend: "1줄:", "1.", bullets, markdown emphasis. Anything else that
//! deviates is reported as a malformed response instead of being guessed at.

use crate::diseases::ResolvedDisease;
use crate::errors::{PipelineError, UpstreamService};
use crate::models::{FoodIdentificationResult, FoodMatch, RiskLevel};
use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Closed list of dishes the model may answer with
pub const CANDIDATE_FOODS: [&str; 20] = [
    "된장찌개", "치킨", "커피", "김치찌개", "불고기", "비빔밥", "삼겹살", "김밥", "라면", "떡볶이",
    "순대", "피자", "햄버거", "스테이크", "파스타", "샐러드", "초밥", "우동", "카레", "만두",
];

/// Reserved answer meaning "not one of the candidates"
pub const NO_MATCH_SENTINEL: &str = "해당 사항 없음";

pub const LABEL_FOOD: &str = "음식";
pub const LABEL_RISK: &str = "위험도";
pub const LABEL_CALORIES: &str = "칼로리";

/// Leading noise: "1줄:", "2 줄 )", "1.", "3)"
static LINE_NUMBER_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\s*(줄\s*[:：.)]?|[.)])\s*").expect("valid line-number regex")
});

/// Build the instruction sent alongside the photo
pub fn build_identification_prompt(diseases: &[ResolvedDisease], candidates: &[&str]) -> String {
    let disease_context = if diseases.is_empty() {
        "없음".to_string()
    } else {
        diseases
            .iter()
            .map(ResolvedDisease::prompt_clause)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let candidate_list = candidates
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", i + 1, name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "이 음식 사진을 보고 아래 음식 리스트 중 하나를 골라, 아래 세 줄 형식으로만 한국어로 답해.\n\
         {food}: <음식 이름>\n\
         {risk}: <안전|주의|위험> - <한 문장 이유>\n\
         {cal}: <1인분 기준 예상 칼로리, 예: 약 550 kcal>\n\
         \n\
         사용자 질환: {context}\n\
         위험도는 위 질환을 가진 사용자가 이 음식을 먹었을 때의 위험 정도로 판단해.\n\
         \n\
         음식 리스트:\n\
         {candidates}\n\
         \n\
         규칙:\n\
         1) 음식 이름은 반드시 위 리스트 중 하나를 그대로 쓰고, 다른 단어/기호/설명은 쓰지 마.\n\
         2) 사진 속 음식이 위 리스트와 전혀 관련이 없으면 '{food}: {sentinel}'만 출력해.\n\
         3) 세 줄 외에는 아무것도 출력하지 마.",
        food = LABEL_FOOD,
        risk = LABEL_RISK,
        cal = LABEL_CALORIES,
        context = disease_context,
        candidates = candidate_list,
        sentinel = NO_MATCH_SENTINEL,
    )
}

/// Strip known noise from the start of a line
fn strip_noise(line: &str) -> String {
    let mut current = line.replace("**", "");
    loop {
        let trimmed = current
            .trim()
            .trim_start_matches(['-', '*', '•', '#', '>'])
            .trim();
        let stripped = LINE_NUMBER_NOISE.replace(trimmed, "").trim().to_string();
        if stripped == current {
            return stripped;
        }
        current = stripped;
    }
}

/// Split `label: value`, accepting ASCII and full-width colons
fn split_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(label)?.trim_start();
    let value = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('：'))?;
    Some(value.trim())
}

/// Remove quoting and trailing punctuation around a food name
fn clean_food_name(value: &str) -> &str {
    value
        .trim()
        .trim_matches(['\'', '"', '`', '「', '」'])
        .trim_end_matches(['.', '。'])
        .trim()
}

fn is_sentinel(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let sentinel: String = NO_MATCH_SENTINEL
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    compact == sentinel
}

/// Parse the three-line contract out of free-form model output
///
/// Empty or missing food → `ResultNotFound`; the sentinel → `FoodMatch::NoMatch`
/// (risk and calorie lines become optional); any other deviation →
/// `UpstreamMalformed`.
pub fn parse_identification_response(
    text: &str,
    candidates: &[&str],
) -> Result<FoodIdentificationResult, PipelineError> {
    let mut food: Option<String> = None;
    let mut risk: Option<String> = None;
    let mut calories: Option<String> = None;

    for raw_line in text.lines() {
        let line = strip_noise(raw_line);
        if line.is_empty() {
            continue;
        }
        if let Some(value) = split_label(&line, LABEL_FOOD) {
            food.get_or_insert_with(|| value.to_string());
        } else if let Some(value) = split_label(&line, LABEL_RISK) {
            risk.get_or_insert_with(|| value.to_string());
        } else if let Some(value) = split_label(&line, LABEL_CALORIES) {
            calories.get_or_insert_with(|| value.to_string());
        }
    }

    let food = food
        .as_deref()
        .map(clean_food_name)
        .filter(|name| !name.is_empty())
        .ok_or(PipelineError::ResultNotFound)?;

    if is_sentinel(food) {
        // Placeholder verdicts ("해당 없음", "-") carry no rating
        let (risk_level, risk_comment) = risk
            .as_deref()
            .map(split_verdict)
            .and_then(|(verdict, comment)| {
                RiskLevel::from_label(verdict).map(|level| (Some(level), comment.to_string()))
            })
            .unwrap_or((None, String::new()));
        return Ok(FoodIdentificationResult {
            food: FoodMatch::NoMatch,
            risk_level,
            risk_comment,
            calories: calories.unwrap_or_default(),
        });
    }

    if !candidates.contains(&food) {
        return Err(PipelineError::malformed(
            UpstreamService::VisionModel,
            format!("food '{}' is not in the candidate list", food),
        ));
    }

    let risk_line = risk.filter(|r| !r.is_empty()).ok_or_else(|| {
        PipelineError::malformed(UpstreamService::VisionModel, "missing 위험도 line")
    })?;
    let (risk_level, risk_comment) = split_risk_line(&risk_line)?;

    let calories = calories.filter(|c| !c.is_empty()).ok_or_else(|| {
        PipelineError::malformed(UpstreamService::VisionModel, "missing 칼로리 line")
    })?;

    Ok(FoodIdentificationResult {
        food: FoodMatch::Identified(food.to_string()),
        risk_level,
        risk_comment,
        calories,
    })
}

/// Verdict/rationale separators: hyphen, en dash, em dash, colon
fn is_verdict_separator(c: char) -> bool {
    matches!(c, '-' | '\u{2013}' | '\u{2014}' | ':' | '\u{FF1A}')
}

/// Split "주의 - 나트륨이 높습니다" on the first separator
fn split_verdict(line: &str) -> (&str, &str) {
    match line.char_indices().find(|(_, c)| is_verdict_separator(*c)) {
        Some((i, c)) => (line[..i].trim(), line[i + c.len_utf8()..].trim()),
        None => (line.trim(), ""),
    }
}

fn split_risk_line(line: &str) -> Result<(Option<RiskLevel>, String), PipelineError> {
    let (verdict, comment) = split_verdict(line);
    let level = RiskLevel::from_label(verdict).ok_or_else(|| {
        PipelineError::malformed(
            UpstreamService::VisionModel,
            format!("unknown risk verdict '{}'", verdict),
        )
    })?;
    Ok((Some(level), comment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diseases::resolve_selection;
    use rstest::rstest;

    fn parse(text: &str) -> Result<FoodIdentificationResult, PipelineError> {
        parse_identification_response(text, &CANDIDATE_FOODS)
    }

    #[test]
    fn test_parse_three_line_contract() {
        let result = parse("음식: 된장찌개\n위험도: 주의 - 나트륨이 높습니다\n칼로리: 약 550 kcal").unwrap();
        assert_eq!(result.food, FoodMatch::Identified("된장찌개".to_string()));
        assert_eq!(result.risk_level, Some(RiskLevel::Caution));
        assert_eq!(result.risk_comment, "나트륨이 높습니다");
        assert_eq!(result.calories, "약 550 kcal");
    }

    #[test]
    fn test_sentinel_is_no_match_not_error() {
        let result = parse("음식: 해당 사항 없음").unwrap();
        assert_eq!(result.food, FoodMatch::NoMatch);
        assert!(!result.food.is_match());
        assert_eq!(result.food.as_str(), NO_MATCH_SENTINEL);
        assert_eq!(result.risk_level, None);
    }

    #[rstest]
    #[case("1줄: 음식: 비빔밥\n2줄: 위험도: 안전 - 채소가 많습니다\n3줄: 칼로리: 약 600 kcal")]
    #[case("**음식:** 비빔밥\n**위험도:** 안전 - 채소가 많습니다\n**칼로리:** 약 600 kcal")]
    #[case("1. 음식: 비빔밥\n2. 위험도: 안전 - 채소가 많습니다\n3. 칼로리: 약 600 kcal")]
    #[case("- 음식：비빔밥\n- 위험도：안전 - 채소가 많습니다\n- 칼로리：약 600 kcal")]
    #[case("분석 결과입니다.\n\n음식: 비빔밥.\n위험도: 안전 - 채소가 많습니다\n칼로리: 약 600 kcal\n")]
    fn test_noise_is_stripped(#[case] text: &str) {
        let result = parse(text).unwrap();
        assert_eq!(result.food, FoodMatch::Identified("비빔밥".to_string()));
        assert_eq!(result.risk_level, Some(RiskLevel::Safe));
        assert_eq!(result.risk_comment, "채소가 많습니다");
        assert_eq!(result.calories, "약 600 kcal");
    }

    #[test]
    fn test_risk_split_on_first_hyphen_only() {
        let result = parse("음식: 라면\n위험도: 위험 - 나트륨이 매우 높음 - 국물 섭취 자제\n칼로리: 500kcal").unwrap();
        assert_eq!(result.risk_level, Some(RiskLevel::Danger));
        assert_eq!(result.risk_comment, "나트륨이 매우 높음 - 국물 섭취 자제");
    }

    #[rstest]
    #[case("음식: 해당 사항 없음\n위험도: 해당 없음\n칼로리: 해당 없음", "해당 없음")]
    #[case("음식: 해당 사항 없음\n위험도: -\n칼로리: -", "-")]
    #[case("음식: 해당 사항 없음\n위험도:\n칼로리:", "")]
    fn test_sentinel_tolerates_placeholder_lines(#[case] text: &str, #[case] calories: &str) {
        let result = parse(text).unwrap();
        assert_eq!(result.food, FoodMatch::NoMatch);
        assert_eq!(result.risk_level, None);
        assert_eq!(result.risk_comment, "");
        assert_eq!(result.calories, calories);
    }

    #[test]
    fn test_sentinel_keeps_recognised_verdict() {
        let result = parse("음식: 해당 사항 없음\n위험도: 주의 - 기름진 음식으로 보입니다").unwrap();
        assert_eq!(result.food, FoodMatch::NoMatch);
        assert_eq!(result.risk_level, Some(RiskLevel::Caution));
        assert_eq!(result.risk_comment, "기름진 음식으로 보입니다");
    }

    #[rstest]
    #[case("주의 – 나트륨이 높습니다")]
    #[case("주의 — 나트륨이 높습니다")]
    #[case("주의: 나트륨이 높습니다")]
    #[case("주의 - 나트륨이 높습니다")]
    fn test_risk_separator_variants(#[case] risk_line: &str) {
        let text = format!("음식: 된장찌개\n위험도: {}\n칼로리: 약 550 kcal", risk_line);
        let result = parse(&text).unwrap();
        assert_eq!(result.risk_level, Some(RiskLevel::Caution));
        assert_eq!(result.risk_comment, "나트륨이 높습니다");
    }

    #[rstest]
    #[case("")]
    #[case("   \n\n")]
    #[case("음식:\n위험도: 주의 - 짜요\n칼로리: 약 500 kcal")]
    #[case("죄송합니다. 사진을 분석할 수 없습니다.")]
    fn test_missing_food_is_result_not_found(#[case] text: &str) {
        assert_eq!(parse(text).unwrap_err(), PipelineError::ResultNotFound);
    }

    #[rstest]
    #[case("음식: 탕수육\n위험도: 주의 - 기름짐\n칼로리: 약 700 kcal")]
    #[case("음식: 김밥\n칼로리: 약 450 kcal")]
    #[case("음식: 김밥\n위험도: 보통 - 무난함\n칼로리: 약 450 kcal")]
    #[case("음식: 김밥\n위험도: 안전 - 무난함")]
    fn test_deviation_is_malformed(#[case] text: &str) {
        match parse(text).unwrap_err() {
            PipelineError::UpstreamMalformed { service, .. } => {
                assert_eq!(service, UpstreamService::VisionModel)
            }
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_prompt_contains_contract_and_context() {
        let diseases = resolve_selection(&["htn", "custom-condition"]);
        let prompt = build_identification_prompt(&diseases, &CANDIDATE_FOODS);
        assert!(prompt.contains("고혈압(나트륨 함량이 높으면 위험)"));
        assert!(prompt.contains("custom-condition"));
        assert!(prompt.contains("20. 만두"));
        assert!(prompt.contains("음식: 해당 사항 없음"));
        assert!(prompt.contains("위험도: <안전|주의|위험>"));
    }

    #[test]
    fn test_prompt_without_diseases() {
        let prompt = build_identification_prompt(&[], &CANDIDATE_FOODS);
        assert!(prompt.contains("사용자 질환: 없음"));
    }
}

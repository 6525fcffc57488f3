//! Dietary advice generation
//!
//! Advice is requested only for diseases at or above the caution threshold.
//! Calls for different diseases are independent and run concurrently.

use crate::clients::{TextModel, TextRequest};
use futures::future::join_all;
use nutriscan_shared::diseases::{disease_info, find_disease};
use nutriscan_shared::errors::{PipelineError, UpstreamService};
use nutriscan_shared::models::{Disease, RiskAssessment, TopFactor, CAUTION_THRESHOLD};
use nutriscan_shared::types::DiseaseReport;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

const SYSTEM_PROMPT: &str = "당신은 한국어로 답하는 전문 영양사이자 가정의학과 전문의입니다.";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

/// Korean display name for a cascade disease, catalog id or free text
pub fn disease_label(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(disease) = Disease::from_str(raw) {
        return disease_info(disease).name.to_string();
    }
    match find_disease(raw) {
        Some(info) => info.name.to_string(),
        None => raw.to_string(),
    }
}

/// Render the explanation list the way the prompt describes it
fn factors_json(top_factors: &[TopFactor]) -> String {
    let entries: Vec<serde_json::Value> = top_factors
        .iter()
        .map(|f| json!({ "feature": f.feature, "value": f.magnitude, "impact": f.direction }))
        .collect();
    serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
}

pub fn build_advice_prompt(disease: &str, risk: f64, top_factors: &[TopFactor]) -> String {
    format!(
        "역할: 너는 한국어로 답하는 전문 영양사 + 가정의학과 전문의이다.\n\
         \n\
         아래는 어떤 사용자의 건강 위험도 예측 결과 중, 한 질환에 대한 정보이다.\n\
         \n\
         - 질환명: {disease}\n\
         - 예측 위험도 (0~1): {risk:.3}\n\
         - 중요 요인 (Top Factors):\n\
         {factors}\n\
         \n\
         설명:\n\
         - value가 클수록 해당 피처가 이번 예측에서 중요했다는 의미이다.\n\
         - impact = \"increase\" 는 이 섭취 패턴이 위험도를 올리는 방향으로 작용했다는 뜻이다.\n\
         - impact = \"decrease\" 는 이 섭취 패턴이 위험도를 낮추는 방향으로 작용했다는 뜻이다.\n\
         \n\
         요청 사항:\n\
         1. 짧고 명확한 한글 문장 2~4개로만 답해라.\n\
         2. 현재 {disease} 위험도가 어느 정도인지 한 문장으로 먼저 요약해라.\n\
         3. 이어서 중요 요인을 기반으로 구체적인 식단/생활습관 추천 2~3가지를 써라.\n\
            - increase 인 피처는 줄이거나 조절하라는 방향으로 권고해라.\n\
            - decrease 인 피처는 유지하거나 조금 더 강화해도 좋다는 방향으로 권고해라.\n\
         4. 존댓말과 권유형 어조(\"~하시는 게 좋겠습니다\")로 작성해라.\n\
         \n\
         주의:\n\
         - JSON 그대로를 다시 출력하지 마라.\n\
         - 의료 진단이 아니라 생활습관/식습관 조언이라는 뉘앙스를 유지해라.",
        disease = disease,
        risk = risk,
        factors = factors_json(top_factors),
    )
}

#[derive(Clone)]
pub struct AdviceService {
    model: Arc<dyn TextModel>,
}

impl AdviceService {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Advice text for one disease; empty, without any outbound call, below
    /// the caution threshold
    pub async fn advise(
        &self,
        disease: &str,
        risk: f64,
        top_factors: &[TopFactor],
    ) -> Result<String, PipelineError> {
        if disease.trim().is_empty() {
            return Err(PipelineError::Validation("disease is required".to_string()));
        }
        if !risk.is_finite() || !(0.0..=1.0).contains(&risk) {
            return Err(PipelineError::Validation("risk must be between 0 and 1".to_string()));
        }
        if risk < CAUTION_THRESHOLD {
            return Ok(String::new());
        }

        let label = disease_label(disease);
        debug!(disease = %label, risk, "Generating advice");
        metrics::counter!("nutriscan_advice_calls_total").increment(1);

        let text = self
            .model
            .generate(TextRequest {
                system: SYSTEM_PROMPT.to_string(),
                prompt: build_advice_prompt(&label, risk, top_factors),
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            })
            .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::malformed(
                UpstreamService::AdviceModel,
                "empty advice text",
            ));
        }
        Ok(text.to_string())
    }

    /// Advice for every assessment at once
    ///
    /// A failure for one disease is reported on that disease only.
    pub async fn advise_all(&self, assessments: Vec<RiskAssessment>) -> Vec<DiseaseReport> {
        let calls = assessments.into_iter().map(|assessment| async move {
            if !assessment.needs_advice() {
                return DiseaseReport {
                    assessment,
                    advice: None,
                    advice_error: None,
                };
            }
            let result = self
                .advise(assessment.disease.as_str(), assessment.risk, &assessment.top_factors)
                .await;
            match result {
                Ok(advice) => DiseaseReport {
                    assessment,
                    advice: Some(advice),
                    advice_error: None,
                },
                Err(err) => {
                    error!(disease = %assessment.disease, error = %err, "Advice generation failed");
                    DiseaseReport {
                        assessment,
                        advice: None,
                        advice_error: Some("조언 생성 중 오류가 발생했습니다.".to_string()),
                    }
                }
            }
        });
        join_all(calls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nutriscan_shared::models::FactorDirection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeTextModel {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        fail_for: Option<&'static str>,
    }

    impl FakeTextModel {
        fn new(fail_for: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                fail_for,
            })
        }
    }

    #[async_trait]
    impl TextModel for FakeTextModel {
        async fn generate(&self, request: TextRequest) -> Result<String, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if let Some(name) = self.fail_for {
                if request.prompt.contains(name) {
                    return Err(PipelineError::UpstreamTimeout {
                        service: UpstreamService::AdviceModel,
                    });
                }
            }
            Ok("  나트륨 섭취를 줄이시는 게 좋겠습니다.  ".to_string())
        }
    }

    fn factors() -> Vec<TopFactor> {
        vec![TopFactor {
            feature: "sodium_g".to_string(),
            magnitude: 0.82,
            direction: FactorDirection::Increase,
        }]
    }

    #[tokio::test]
    async fn test_low_risk_makes_no_call() {
        let model = FakeTextModel::new(None);
        let service = AdviceService::new(model.clone());
        let advice = service.advise("hypertension", 0.39, &factors()).await.unwrap();
        assert_eq!(advice, "");
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let model = FakeTextModel::new(None);
        let service = AdviceService::new(model.clone());
        let advice = service.advise("htn", 0.4, &factors()).await.unwrap();
        assert_eq!(advice, "나트륨 섭취를 줄이시는 게 좋겠습니다.");
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("질환명: 고혈압"));
        assert!(prompts[0].contains("\"impact\": \"increase\""));
    }

    #[tokio::test]
    async fn test_invalid_risk_rejected() {
        let service = AdviceService::new(FakeTextModel::new(None));
        assert!(matches!(
            service.advise("dm", 1.4, &[]).await,
            Err(PipelineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_advise_all_isolates_failures() {
        let model = FakeTextModel::new(Some("당뇨병"));
        let service = AdviceService::new(model.clone());
        let assessments = vec![
            RiskAssessment::new(Disease::Diabetes, 0.8, factors()),
            RiskAssessment::new(Disease::Hypertension, 0.5, factors()),
            RiskAssessment::new(Disease::Dyslipidemia, 0.1, vec![]),
            RiskAssessment::new(Disease::Osas, 0.45, factors()),
        ];

        let reports = service.advise_all(assessments).await;

        assert_eq!(reports.len(), 4);
        assert!(reports[0].advice.is_none());
        assert!(reports[0].advice_error.is_some());
        assert!(reports[1].advice.is_some());
        assert!(reports[2].advice.is_none() && reports[2].advice_error.is_none());
        assert!(reports[3].advice.is_some());
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_disease_label_resolution() {
        assert_eq!(disease_label("diabetes"), "당뇨병");
        assert_eq!(disease_label("gout"), "통풍");
        assert_eq!(disease_label("천식"), "천식");
    }
}

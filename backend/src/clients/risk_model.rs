//! Hosted tabular risk model
//!
//! `POST {endpoint}/predict` with the ten raw inputs. The endpoint runs the
//! cascade itself and answers with one entry per disease:
//!
//! ```json
//! { "diabetes": { "risk": 0.42, "top_factors": [ { "feature": "sugar", "value": 0.8, "impact": "increase" } ] },
//!   "hypertension": { ... }, "dyslipidemia": { ... }, "osas": { ... } }
//! ```

use super::{build_http_client, record_failure, reject_unless_success, transport_error, RiskModelEndpoint};
use async_trait::async_trait;
use nutriscan_shared::errors::{PipelineError, UpstreamService};
use nutriscan_shared::models::{Disease, RiskAssessment, TopFactor};
use nutriscan_shared::types::RiskInputs;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const SERVICE: UpstreamService = UpstreamService::RiskModel;

#[derive(Debug, Deserialize)]
struct StageResult {
    risk: f64,
    #[serde(default)]
    top_factors: Vec<TopFactor>,
}

pub struct RemoteRiskModelClient {
    endpoint_url: Option<String>,
    client: reqwest::Client,
}

impl RemoteRiskModelClient {
    pub fn new(endpoint_url: Option<String>, timeout: std::time::Duration) -> Result<Self, PipelineError> {
        Ok(Self {
            endpoint_url: endpoint_url
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            client: build_http_client(timeout)?,
        })
    }

    fn predict_url(&self) -> Result<String, PipelineError> {
        self.endpoint_url
            .as_ref()
            .map(|base| format!("{}/predict", base))
            .ok_or_else(|| PipelineError::Configuration("risk model endpoint is not configured".to_string()))
    }
}

/// Reorder the response into cascade order, insisting on all four diseases
fn into_assessments(mut body: HashMap<String, StageResult>) -> Result<Vec<RiskAssessment>, PipelineError> {
    let mut assessments = Vec::with_capacity(Disease::CASCADE_ORDER.len());
    for disease in Disease::CASCADE_ORDER {
        let stage = body.remove(disease.as_str()).ok_or_else(|| {
            PipelineError::malformed(SERVICE, format!("response is missing {}", disease))
        })?;
        if !stage.risk.is_finite() || !(0.0..=1.0).contains(&stage.risk) {
            return Err(PipelineError::malformed(
                SERVICE,
                format!("{} risk {} is outside [0, 1]", disease, stage.risk),
            ));
        }
        assessments.push(RiskAssessment::new(disease, stage.risk, stage.top_factors));
    }
    Ok(assessments)
}

#[async_trait]
impl RiskModelEndpoint for RemoteRiskModelClient {
    async fn predict(&self, inputs: &RiskInputs) -> Result<Vec<RiskAssessment>, PipelineError> {
        let url = self.predict_url()?;
        debug!(url = %url, "Calling hosted risk model");

        let response = self
            .client
            .post(&url)
            .json(&inputs.to_request())
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let response = reject_unless_success(SERVICE, response).await?;

        let body: HashMap<String, StageResult> = response
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        into_assessments(body).map_err(|err| {
            tracing::error!(error = %err, "Hosted risk model response rejected");
            record_failure(&err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(risk: f64) -> StageResult {
        StageResult {
            risk,
            top_factors: vec![],
        }
    }

    #[test]
    fn test_assessments_follow_cascade_order() {
        let body = HashMap::from([
            ("osas".to_string(), stage(0.1)),
            ("diabetes".to_string(), stage(0.5)),
            ("dyslipidemia".to_string(), stage(0.3)),
            ("hypertension".to_string(), stage(0.8)),
        ]);
        let assessments = into_assessments(body).unwrap();
        let order: Vec<Disease> = assessments.iter().map(|a| a.disease).collect();
        assert_eq!(order, Disease::CASCADE_ORDER.to_vec());
        assert_eq!(assessments[1].risk, 0.8);
    }

    #[test]
    fn test_missing_disease_is_malformed() {
        let body = HashMap::from([
            ("diabetes".to_string(), stage(0.5)),
            ("hypertension".to_string(), stage(0.8)),
            ("dyslipidemia".to_string(), stage(0.3)),
        ]);
        let err = into_assessments(body).unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamMalformed { .. }));
        assert!(err.to_string().contains("osas"));
    }

    #[test]
    fn test_out_of_range_risk_is_malformed() {
        let body = HashMap::from([
            ("diabetes".to_string(), stage(1.5)),
            ("hypertension".to_string(), stage(0.8)),
            ("dyslipidemia".to_string(), stage(0.3)),
            ("osas".to_string(), stage(0.1)),
        ]);
        assert!(into_assessments(body).is_err());
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_configuration_error() {
        let client = RemoteRiskModelClient::new(None, std::time::Duration::from_secs(1)).unwrap();
        let inputs = nutriscan_shared::types::PredictHealthRequest {
            gender: Some(0.0),
            age: Some(40.0),
            energy: Some(1800.0),
            protein: Some(60.0),
            fat: Some(50.0),
            carbs: Some(250.0),
            sugar: Some(30.0),
            sodium_mg: Some(2500.0),
            calcium_mg: Some(500.0),
            vitaminc_mg: Some(70.0),
        }
        .into_inputs()
        .unwrap();
        let err = client.predict(&inputs).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}

//! Cascaded risk scoring
//!
//! Four binary classifiers run strictly in sequence:
//! diabetes → hypertension → dyslipidemia → osas. Stage `i` sees the ten
//! normalized features plus the positive-class probabilities of stages
//! `0..i`, so input widths are 10, 11, 12 and 13. A failure at any stage
//! fails the whole run; no partial result is returned.

use super::model_store::ModelStore;
use async_trait::async_trait;
use nutriscan_shared::errors::{PipelineError, UpstreamService};
use nutriscan_shared::features::{FeatureVector, FEATURE_NAMES};
use nutriscan_shared::models::{Disease, RiskAssessment, TopFactor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Number of explanation entries kept per disease
pub const TOP_FACTOR_COUNT: usize = 3;

const SERVICE: UpstreamService = UpstreamService::RiskModel;

/// Output of one stage classifier
#[derive(Debug, Clone, PartialEq)]
pub struct StagePrediction {
    /// `[P(negative), P(positive)]`
    pub probabilities: Vec<f64>,
    /// Signed per-feature contribution, aligned with the input vector
    pub contributions: Vec<f64>,
}

/// A single stage of the cascade
#[async_trait]
pub trait StageClassifier: Send + Sync {
    async fn predict(&self, disease: Disease, features: &[f64]) -> Result<StagePrediction, PipelineError>;
}

// ============================================================================
// Local logistic stages
// ============================================================================

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Logistic stages from the model bundle
pub struct BundleClassifier {
    store: Arc<ModelStore>,
}

impl BundleClassifier {
    pub fn new(store: Arc<ModelStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StageClassifier for BundleClassifier {
    async fn predict(&self, disease: Disease, features: &[f64]) -> Result<StagePrediction, PipelineError> {
        let bundle = self.store.get().await?;
        let stage = bundle.stage(disease);
        if stage.coefficients.len() != features.len() {
            return Err(PipelineError::malformed(
                SERVICE,
                format!(
                    "{} stage takes {} features, got {}",
                    disease,
                    stage.coefficients.len(),
                    features.len()
                ),
            ));
        }

        let contributions: Vec<f64> = stage
            .coefficients
            .iter()
            .zip(features)
            .map(|(c, x)| c * x)
            .collect();
        let p = sigmoid(stage.intercept + contributions.iter().sum::<f64>());

        Ok(StagePrediction {
            probabilities: vec![1.0 - p, p],
            contributions,
        })
    }
}

// ============================================================================
// Cascade
// ============================================================================

/// Positive-class probability, rejecting anything that is not a distribution
/// over two classes
fn positive_probability(disease: Disease, probabilities: &[f64]) -> Result<f64, PipelineError> {
    if probabilities.len() != 2 {
        return Err(PipelineError::malformed(
            SERVICE,
            format!("{} stage returned {} probabilities", disease, probabilities.len()),
        ));
    }
    let p = probabilities[1];
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(PipelineError::malformed(
            SERVICE,
            format!("{} stage probability {} is outside [0, 1]", disease, p),
        ));
    }
    Ok(p)
}

/// Largest absolute contributions first
pub fn rank_top_factors(names: &[String], contributions: &[f64], count: usize) -> Vec<TopFactor> {
    let mut ranked: Vec<(&String, f64)> = names
        .iter()
        .zip(contributions.iter().copied())
        .filter(|(_, c)| c.is_finite())
        .collect();
    ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    ranked
        .into_iter()
        .take(count)
        .map(|(name, c)| TopFactor::from_contribution(name.clone(), c))
        .collect()
}

/// Runs the four stages in order
#[derive(Clone)]
pub struct CascadeScorer {
    classifier: Arc<dyn StageClassifier>,
    stage_timeout: Duration,
}

impl CascadeScorer {
    pub fn new(classifier: Arc<dyn StageClassifier>, stage_timeout: Duration) -> Self {
        Self {
            classifier,
            stage_timeout,
        }
    }

    /// Four assessments in cascade order, or the first stage error
    pub async fn score(&self, features: &FeatureVector) -> Result<Vec<RiskAssessment>, PipelineError> {
        let result = self.run(features).await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("nutriscan_cascade_runs_total", "outcome" => outcome).increment(1);
        if let Err(err) = &result {
            error!(kind = err.kind(), error = %err, "Risk cascade failed");
        }
        result
    }

    async fn run(&self, features: &FeatureVector) -> Result<Vec<RiskAssessment>, PipelineError> {
        let mut inputs = features.to_vec();
        let mut names: Vec<String> = FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
        let mut assessments = Vec::with_capacity(Disease::CASCADE_ORDER.len());

        for disease in Disease::CASCADE_ORDER {
            debug_assert_eq!(inputs.len(), disease.input_width());

            let prediction = tokio::time::timeout(
                self.stage_timeout,
                self.classifier.predict(disease, &inputs),
            )
            .await
            .map_err(|_| PipelineError::UpstreamTimeout { service: SERVICE })??;

            let risk = positive_probability(disease, &prediction.probabilities)?;
            debug!(disease = %disease, risk, "Cascade stage complete");

            let top_factors = rank_top_factors(&names, &prediction.contributions, TOP_FACTOR_COUNT);
            assessments.push(RiskAssessment::new(disease, risk, top_factors));

            inputs.push(risk);
            names.push(disease.feature_name().to_string());
        }

        Ok(assessments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::model_store::test_support::sample_bundle;
    use nutriscan_shared::models::FactorDirection;
    use std::sync::Mutex;

    /// Records every call and answers with a fixed probability per stage
    struct RecordingClassifier {
        calls: Mutex<Vec<(Disease, Vec<f64>)>>,
        fail_at: Option<Disease>,
        stall_at: Option<Disease>,
    }

    impl RecordingClassifier {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_at: None,
                stall_at: None,
            }
        }

        fn probability(disease: Disease) -> f64 {
            match disease {
                Disease::Diabetes => 0.1,
                Disease::Hypertension => 0.2,
                Disease::Dyslipidemia => 0.3,
                Disease::Osas => 0.4,
            }
        }
    }

    #[async_trait]
    impl StageClassifier for RecordingClassifier {
        async fn predict(&self, disease: Disease, features: &[f64]) -> Result<StagePrediction, PipelineError> {
            self.calls.lock().unwrap().push((disease, features.to_vec()));
            if self.fail_at == Some(disease) {
                return Err(PipelineError::UpstreamRejected {
                    service: UpstreamService::RiskModel,
                    status: 500,
                });
            }
            if self.stall_at == Some(disease) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            let p = Self::probability(disease);
            Ok(StagePrediction {
                probabilities: vec![1.0 - p, p],
                contributions: vec![0.0; features.len()],
            })
        }
    }

    fn features() -> FeatureVector {
        FeatureVector([0.5, -1.0, 0.2, 0.0, 0.3, 1.1, 2.0, 1.5, -0.4, 0.1])
    }

    #[tokio::test]
    async fn test_stages_run_in_order_with_growing_inputs() {
        let classifier = Arc::new(RecordingClassifier::new());
        let scorer = CascadeScorer::new(classifier.clone(), Duration::from_secs(5));

        let assessments = scorer.score(&features()).await.unwrap();

        let calls = classifier.calls.lock().unwrap();
        let order: Vec<Disease> = calls.iter().map(|(d, _)| *d).collect();
        assert_eq!(order, Disease::CASCADE_ORDER.to_vec());

        let widths: Vec<usize> = calls.iter().map(|(_, f)| f.len()).collect();
        assert_eq!(widths, vec![10, 11, 12, 13]);

        // Each stage sees exactly the previous stages' outputs appended
        assert_eq!(&calls[3].1[..10], features().values());
        assert_eq!(&calls[3].1[10..], &[0.1, 0.2, 0.3]);

        let risks: Vec<f64> = assessments.iter().map(|a| a.risk).collect();
        assert_eq!(risks, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_failure_mid_cascade_returns_no_partial_result() {
        let mut classifier = RecordingClassifier::new();
        classifier.fail_at = Some(Disease::Hypertension);
        let classifier = Arc::new(classifier);
        let scorer = CascadeScorer::new(classifier.clone(), Duration::from_secs(5));

        let err = scorer.score(&features()).await.unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamRejected { status: 500, .. }));
        // Later stages never ran
        assert_eq!(classifier.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_stage_times_out() {
        let mut classifier = RecordingClassifier::new();
        classifier.stall_at = Some(Disease::Dyslipidemia);
        let scorer = CascadeScorer::new(Arc::new(classifier), Duration::from_secs(2));

        let err = scorer.score(&features()).await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::UpstreamTimeout {
                service: UpstreamService::RiskModel
            }
        );
    }

    #[test]
    fn test_invalid_probabilities_rejected() {
        assert!(positive_probability(Disease::Osas, &[0.3, 0.7]).is_ok());
        assert!(positive_probability(Disease::Osas, &[0.7]).is_err());
        assert!(positive_probability(Disease::Osas, &[-0.5, 1.5]).is_err());
        assert!(positive_probability(Disease::Osas, &[0.5, f64::NAN]).is_err());
    }

    #[test]
    fn test_top_factors_by_absolute_contribution() {
        let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let factors = rank_top_factors(&names, &[0.1, -0.9, 0.5, 0.05], 3);
        let ranked: Vec<&str> = factors.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(ranked, vec!["b", "c", "a"]);
        assert_eq!(factors[0].direction, FactorDirection::Decrease);
        assert_eq!(factors[0].magnitude, 0.9);
    }

    #[tokio::test]
    async fn test_bundle_classifier_end_to_end() {
        let store = Arc::new(ModelStore::preloaded(sample_bundle()).unwrap());
        let scorer = CascadeScorer::new(
            Arc::new(BundleClassifier::new(store)),
            Duration::from_secs(5),
        );

        let assessments = scorer.score(&features()).await.unwrap();
        assert_eq!(assessments.len(), 4);

        // diabetes: σ(-0.5 + 0.5·2.0 + 0.8·1.5) = σ(1.7)
        let expected = 1.0 / (1.0 + (-1.7f64).exp());
        assert!((assessments[0].risk - expected).abs() < 1e-12);
        assert_eq!(assessments[0].top_factors[0].feature, "sodium_g");

        // Later stages weigh the previous stage's output
        let names: Vec<&str> = assessments[1]
            .top_factors
            .iter()
            .map(|f| f.feature.as_str())
            .collect();
        assert!(names.contains(&"diabetes_risk"));
        for a in &assessments {
            assert!((0.0..=1.0).contains(&a.risk));
        }
    }

    #[test]
    fn test_sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
    }

    // ========================================================================
    // Property-based tests
    // ========================================================================

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_sigmoid_stays_in_unit_interval(z in -1.0e6f64..1.0e6) {
            let p = sigmoid(z);
            prop_assert!((0.0..=1.0).contains(&p));
        }

        #[test]
        fn prop_top_factors_sorted_and_bounded(
            contributions in prop::collection::vec(-10.0f64..10.0, 1..14)
        ) {
            let names: Vec<String> = (0..contributions.len()).map(|i| format!("f{}", i)).collect();
            let factors = rank_top_factors(&names, &contributions, TOP_FACTOR_COUNT);

            prop_assert!(factors.len() <= TOP_FACTOR_COUNT);
            prop_assert_eq!(factors.len(), contributions.len().min(TOP_FACTOR_COUNT));
            for pair in factors.windows(2) {
                prop_assert!(pair[0].magnitude >= pair[1].magnitude);
            }
        }
    }
}

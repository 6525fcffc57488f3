//! Outbound clients for external collaborators
//!
//! Each collaborator sits behind a trait so services can be exercised with
//! fakes. Every HTTP failure is classified into the pipeline taxonomy here,
//! in one place.

pub mod openai;
pub mod risk_model;
pub mod storage;

use async_trait::async_trait;
use nutriscan_shared::errors::{PipelineError, UpstreamService};
use nutriscan_shared::models::FoodImage;
use nutriscan_shared::types::RiskInputs;
use nutriscan_shared::RiskAssessment;

pub use openai::OpenAiClient;
pub use risk_model::RemoteRiskModelClient;
pub use storage::HttpObjectStorage;

/// Text generation conditioned on an image
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn describe_image(&self, prompt: &str, image: &FoodImage) -> Result<String, PipelineError>;
}

/// Single-turn text generation
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, request: TextRequest) -> Result<String, PipelineError>;
}

/// Hosted tabular model that runs the whole cascade remotely
#[async_trait]
pub trait RiskModelEndpoint: Send + Sync {
    /// Four assessments in cascade order
    async fn predict(&self, inputs: &RiskInputs) -> Result<Vec<RiskAssessment>, PipelineError>;
}

/// Managed object store for uploaded photos
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store bytes under `path`; returns the public URL
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, PipelineError>;

    async fn delete(&self, path: &str) -> Result<(), PipelineError>;

    /// Recover the object path from a URL returned by `upload`
    fn object_path_from_url(&self, url: &str) -> Option<String>;
}

// ============================================================================
// Failure classification
// ============================================================================

/// Status used when the service could not be reached at all
pub const UNREACHABLE_STATUS: u16 = 503;

/// Classify a transport-level reqwest failure
pub(crate) fn transport_error(service: UpstreamService, err: reqwest::Error) -> PipelineError {
    let classified = if err.is_timeout() {
        PipelineError::UpstreamTimeout { service }
    } else if let Some(status) = err.status() {
        PipelineError::UpstreamRejected {
            service,
            status: status.as_u16(),
        }
    } else if err.is_decode() {
        PipelineError::malformed(service, err.to_string())
    } else {
        PipelineError::UpstreamRejected {
            service,
            status: UNREACHABLE_STATUS,
        }
    };
    tracing::error!(service = %service, error = %err, "Request to {} failed", service);
    record_failure(&classified);
    classified
}

/// Turn a non-success response into `UpstreamRejected`, logging its body
pub(crate) async fn reject_unless_success(
    service: UpstreamService,
    response: reqwest::Response,
) -> Result<reqwest::Response, PipelineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(service = %service, status = status.as_u16(), body = %body, "{} returned an error status", service);
    let err = PipelineError::UpstreamRejected {
        service,
        status: status.as_u16(),
    };
    record_failure(&err);
    Err(err)
}

/// Count a classified upstream failure
pub(crate) fn record_failure(err: &PipelineError) {
    let service = match err {
        PipelineError::UpstreamRejected { service, .. }
        | PipelineError::UpstreamTimeout { service }
        | PipelineError::UpstreamMalformed { service, .. } => service.as_str(),
        _ => "pipeline",
    };
    metrics::counter!(
        "nutriscan_upstream_failures_total",
        "service" => service,
        "kind" => err.kind()
    )
    .increment(1);
}

/// Shared reqwest client with a whole-request timeout
pub(crate) fn build_http_client(timeout: std::time::Duration) -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Configuration(format!("failed to build HTTP client: {}", e)))
}

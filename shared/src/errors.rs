//! Error types for the health-risk inference pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// External collaborator a pipeline stage talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamService {
    /// Vision-capable text generation (food identification)
    VisionModel,
    /// Text generation (dietary advice)
    AdviceModel,
    /// Tabular risk model (local bundle or hosted endpoint)
    RiskModel,
    /// Managed object store holding food images
    ObjectStorage,
}

impl UpstreamService {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamService::VisionModel => "vision_model",
            UpstreamService::AdviceModel => "advice_model",
            UpstreamService::RiskModel => "risk_model",
            UpstreamService::ObjectStorage => "object_storage",
        }
    }
}

impl fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by every pipeline stage
///
/// Stages never swallow these; the HTTP layer maps them to a generic
/// user-facing message and logs the detail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Required credential or endpoint is absent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing or invalid input, rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-success HTTP status from an external service
    #[error("{service} rejected the request with status {status}")]
    UpstreamRejected { service: UpstreamService, status: u16 },

    /// External call exceeded its time bound
    #[error("{service} timed out")]
    UpstreamTimeout { service: UpstreamService },

    /// Success response that does not match the expected contract
    #[error("{service} returned a malformed response: {reason}")]
    UpstreamMalformed {
        service: UpstreamService,
        reason: String,
    },

    /// The identification response carried no usable food name
    #[error("Result not found in model response")]
    ResultNotFound,

    /// Reference data (scaler, model weights) is not available yet
    #[error("Not initialized: {0}")]
    NotInitialized(String),
}

impl PipelineError {
    pub fn malformed(service: UpstreamService, reason: impl Into<String>) -> Self {
        PipelineError::UpstreamMalformed {
            service,
            reason: reason.into(),
        }
    }

    /// True when the upstream refused because of rate limiting (HTTP 429)
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PipelineError::UpstreamRejected { status: 429, .. })
    }

    /// Short classification label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Validation(_) => "validation",
            PipelineError::UpstreamRejected { .. } => "rejected",
            PipelineError::UpstreamTimeout { .. } => "timeout",
            PipelineError::UpstreamMalformed { .. } => "malformed",
            PipelineError::ResultNotFound => "result_not_found",
            PipelineError::NotInitialized(_) => "not_initialized",
        }
    }
}

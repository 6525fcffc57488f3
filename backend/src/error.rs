//! Application error handling
//!
//! Converts pipeline and infrastructure errors into HTTP responses. Clients
//! only ever see a short Korean message; the technical cause is logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nutriscan_shared::errors::PipelineError;
use nutriscan_shared::types::{ErrorDetail, ErrorResponse};
use nutriscan_shared::validation::ValidationError;
use thiserror::Error;
use tracing::{error, warn};

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    InvalidField(#[from] ValidationError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Status, machine code and user-facing message
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::InvalidField(err) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.user_message())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Pipeline(err) => pipeline_parts(err),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "일시적인 오류가 발생했습니다. 잠시 후 다시 시도해 주세요.".to_string(),
            ),
        }
    }

    /// Offending request field, when the error names one
    fn field(&self) -> Option<String> {
        match self {
            ApiError::InvalidField(err) => Some(err.field.clone()),
            _ => None,
        }
    }
}

fn pipeline_parts(err: &PipelineError) -> (StatusCode, &'static str, String) {
    match err {
        PipelineError::Configuration(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "CONFIGURATION_ERROR",
            "서버 설정 오류입니다.".to_string(),
        ),
        PipelineError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        PipelineError::UpstreamRejected { .. } if err.is_rate_limited() => (
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "요청이 너무 많습니다. 잠시 후 다시 시도해주세요.".to_string(),
        ),
        PipelineError::UpstreamRejected { .. } => (
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_REJECTED",
            "AI 분석 중 오류가 발생했습니다.".to_string(),
        ),
        PipelineError::UpstreamTimeout { .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            "UPSTREAM_TIMEOUT",
            "응답 시간이 초과되었습니다. 잠시 후 다시 시도해 주세요.".to_string(),
        ),
        PipelineError::UpstreamMalformed { .. } => (
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_MALFORMED",
            "AI 분석 중 오류가 발생했습니다.".to_string(),
        ),
        PipelineError::ResultNotFound => (
            StatusCode::BAD_GATEWAY,
            "RESULT_NOT_FOUND",
            "AI 응답에서 결과를 찾지 못했습니다.".to_string(),
        ),
        PipelineError::NotInitialized(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "NOT_INITIALIZED",
            "예측 모델이 준비되지 않았습니다.".to_string(),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        match &self {
            ApiError::Internal(err) => error!("Internal error: {:?}", err),
            ApiError::Pipeline(err) if status.is_server_error() => {
                error!(kind = err.kind(), "Pipeline error: {}", err)
            }
            ApiError::Pipeline(err) => warn!(kind = err.kind(), "Pipeline error: {}", err),
            _ => {}
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field: self.field(),
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

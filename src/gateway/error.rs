use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::pipeline::{AnalysisError, AnalysisResponse};

use super::status_headers;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("upload exceeds the size limit")]
    PayloadTooLarge,

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Analysis(e) => match e {
                AnalysisError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                AnalysisError::DecodeFailure { .. } | AnalysisError::NoUsableSamples { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                AnalysisError::AnalysisFailed { .. } => StatusCode::BAD_GATEWAY,
                AnalysisError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> AnalysisResponse {
        match self {
            GatewayError::InvalidRequest(message) => AnalysisResponse::Error {
                kind: "invalid_request",
                message: message.clone(),
            },
            GatewayError::PayloadTooLarge => AnalysisResponse::Error {
                kind: "payload_too_large",
                message: self.to_string(),
            },
            GatewayError::Analysis(e) => AnalysisResponse::from(e),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, status_headers("error"), Json(self.body())).into_response()
    }
}

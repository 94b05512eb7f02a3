use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::gateway::status_headers;
use crate::pipeline::AnalysisResponse;

/// Multipart field holding the media file.
pub const UPLOAD_FIELD: &str = "file";

#[instrument(skip(state, multipart), fields(filename = tracing::field::Empty))]
pub async fn analyze_handler(
    State(state): State<HandlerState>,
    mut multipart: Multipart,
) -> Result<Response, GatewayError> {
    let (filename, bytes) = read_upload(&mut multipart).await?;
    tracing::Span::current().record("filename", tracing::field::display(&filename));
    debug!(bytes = bytes.len(), "Upload received");

    let report = state.pipeline.analyze_upload(&bytes, &filename).await?;
    let verdict = report.classification.verdict();

    Ok((
        StatusCode::OK,
        status_headers(verdict.as_str()),
        Json(AnalysisResponse::Success(report)),
    )
        .into_response())
}

/// Returns the declared filename and contents of the `file` field.
pub(crate) async fn read_upload(
    multipart: &mut Multipart,
) -> Result<(String, Bytes), GatewayError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::InvalidRequest("upload has no filename".to_string()))?;

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(GatewayError::InvalidRequest("upload is empty".to_string()));
        }
        return Ok((filename, bytes));
    }

    Err(GatewayError::InvalidRequest(format!(
        "missing '{UPLOAD_FIELD}' field"
    )))
}

fn multipart_error(err: MultipartError) -> GatewayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge
    } else {
        GatewayError::InvalidRequest(err.body_text())
    }
}

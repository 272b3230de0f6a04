use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::domain::jobs::CompileSource;

use super::error::{ApiError, messages};
use super::models::CompileRequest;
use super::state::ApiState;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_DISPOSITION: &str = "attachment; filename=\"cv.pdf\"";

pub async fn compile(
    State(state): State<ApiState>,
    payload: Result<Json<CompileRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return reject_body(rejection).into_response(),
    };

    let source = match CompileSource::parse(request.latex) {
        Ok(source) => source,
        Err(err) => {
            return ApiError::bad_request(messages::NO_CONTENT, err.to_string()).into_response();
        }
    };

    match state.compile.compile(&source).await {
        Ok(artifact) => (
            [
                (header::CONTENT_TYPE, PDF_CONTENT_TYPE),
                (header::CONTENT_DISPOSITION, PDF_DISPOSITION),
            ],
            artifact.bytes,
        )
            .into_response(),
        Err(err) => ApiError::compilation_failed(&err).into_response(),
    }
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    match rejection {
        // A body without a JSON content type carries no `latex` field.
        JsonRejection::MissingJsonContentType(inner) => {
            ApiError::bad_request(messages::NO_CONTENT, inner.body_text())
        }
        other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => ApiError::client(
            StatusCode::PAYLOAD_TOO_LARGE,
            messages::PAYLOAD_TOO_LARGE,
            other.body_text(),
        ),
        other => ApiError::bad_request(messages::INVALID_BODY, other.body_text()),
    }
}

use crate::application::auth::AuthError;
use crate::application::compile::CompileError;
use crate::application::error::ErrorReport;
use crate::domain::jobs::JobId;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub mod messages {
    pub const UNAUTHORIZED: &str = "Unauthorized";
    pub const NO_CONTENT: &str = "No LaTeX content provided";
    pub const INVALID_BODY: &str = "Invalid JSON body";
    pub const PAYLOAD_TOO_LARGE: &str = "Request body too large";
    pub const COMPILATION_FAILED: &str = "Compilation failed";
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: Option<String>,
    job_id: Option<JobId>,
    report: ErrorReport,
}

impl ApiError {
    pub fn unauthorized(reason: &AuthError) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: messages::UNAUTHORIZED,
            message: None,
            job_id: None,
            report: ErrorReport::from_error(
                "infra::http::api::auth",
                StatusCode::UNAUTHORIZED,
                reason,
            ),
        }
    }

    pub fn bad_request(error: &'static str, detail: impl Into<String>) -> Self {
        Self::client(StatusCode::BAD_REQUEST, error, detail)
    }

    pub fn client(status: StatusCode, error: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: None,
            job_id: None,
            report: ErrorReport::from_message("infra::http::api", status, detail),
        }
    }

    pub fn compilation_failed(err: &CompileError) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self {
            status,
            error: messages::COMPILATION_FAILED,
            message: Some(err.public_message().to_string()),
            job_id: Some(err.job_id),
            report: ErrorReport::from_error("infra::http::api::compile", status, err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.error.to_string(),
            message: self.message,
            job_id: self.job_id,
        };
        let mut response = (self.status, Json(body)).into_response();
        // Attach a structured report so shared logging middleware can emit rich diagnostics.
        self.report.attach(&mut response);
        response
    }
}

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::error::ApiError;
use super::state::ApiState;

/// Reject requests whose `Authorization: Bearer` token does not match the
/// shared secret. Runs before the body is read, so rejected requests never
/// allocate a job.
pub async fn require_shared_secret(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers().get(header::AUTHORIZATION));

    if let Err(reason) = state.secret.verify(token) {
        return ApiError::unauthorized(&reason).into_response();
    }

    next.run(request).await
}

fn extract_token(header: Option<&HeaderValue>) -> Option<&str> {
    let raw = header?.to_str().ok()?;
    raw.strip_prefix("Bearer ")
}

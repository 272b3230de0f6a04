use axum::Json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::api::models::HealthResponse;

pub(super) async fn health() -> Json<HealthResponse> {
    let now = OffsetDateTime::now_utc();
    let timestamp = now
        .format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

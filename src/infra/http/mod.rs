pub mod api;
mod health;
mod middleware;

pub use api::ApiState;

use axum::{Router, middleware as axum_middleware, routing::get};

use self::middleware::{log_responses, set_request_context};

/// Assemble the public router: unauthenticated `/health` plus the guarded
/// `/compile` endpoint.
pub fn build_router(state: ApiState, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .merge(api::build_api_router(state.clone(), body_limit))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

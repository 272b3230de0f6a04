pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware, routing::post};

pub fn build_api_router(state: ApiState, body_limit: usize) -> Router<ApiState> {
    Router::new()
        .route("/compile", post(handlers::compile))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_shared_secret,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
}

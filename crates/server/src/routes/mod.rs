//! HTTP routes for the order API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health          - Liveness check
//! GET  /health/ready    - Readiness check (storage reachable)
//!
//! # Orders (bearer token required)
//! POST /orders          - Place an order     (create:orders + verified email)
//! GET  /orders          - List own orders    (read:orders)
//! GET  /orders/summary  - Recent orders      (read:orders_summary, M2M only)
//! ```

pub mod health;
pub mod orders;


use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, Request, header},
    middleware,
    routing::get,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::request_id::{request_id, request_id_middleware};
use crate::state::AppState;

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/summary", get(orders::summary))
}

/// Build the complete application router with its middleware stack.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().allowed_origins);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(order_routes())
        .fallback(not_found)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = request_id(request.headers()).unwrap_or_default(),
                )
            }),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Build the CORS layer from the configured origins.
///
/// With no origins configured, cross-origin requests are not allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

async fn not_found() -> AppError {
    AppError::NotFound
}

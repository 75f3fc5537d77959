//! Web API router construction and shared response utilities.

use axum::{
    Router,
    http::{HeaderValue, Method},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{questions, status, videos};

/// Cache-Control presets for API responses.
pub mod cache {
    /// Free-text video search results.
    pub const SEARCH: &str = "public, max-age=60, s-maxage=300, stale-while-revalidate=120";
    /// Per-question artifacts; the server-side cache is authoritative.
    pub const NO_STORE: &str = "private, no-store, must-revalidate";
}

/// Wraps a JSON response with a `Cache-Control` header.
pub fn with_cache_control<T: serde::Serialize>(value: T, header: &'static str) -> Response {
    let mut response = Json(value).into_response();
    response.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(header),
    );
    response
}

/// Creates the web server router. Routes are mounted at the root, matching
/// the paths the frontend calls.
///
/// `request_timeout` bounds whole requests and should exceed the provider
/// timeout plus queueing time, so slow generations surface as provider errors.
pub fn create_router(app_state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route(
            "/questions/{id}/ai-solution",
            post(questions::ai_solution),
        )
        .route("/questions/{id}/videos", get(questions::video_links))
        .route("/videos/search", get(videos::search))
        .route("/videos/topic", get(videos::topic))
        .route("/videos/{video_id}", get(videos::details))
        .with_state(app_state)
        .layer((
            // Outermost: per-request ID span + severity-proportional response logging.
            RequestIdLayer,
            // The frontend is served from a different origin.
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
            CompressionLayer::new()
                .zstd(true)
                .br(true)
                .gzip(true)
                .quality(tower_http::CompressionLevel::Fastest),
            TimeoutLayer::new(request_timeout),
        ))
}

// CORS layer for the console front-end
use axum::http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

/// Headers the console is allowed to send
const ALLOWED_HEADERS: &[&str] = &[
    "authorization",
    "x-client-info",
    "apikey",
    "content-type",
    "x-tenant-id",
    "x-persona-id",
    "x-dev-override",
];

/// Permissive CORS; answers OPTIONS preflights with an empty body
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers(
            ALLOWED_HEADERS
                .iter()
                .map(|&h| HeaderName::from_static(h))
                .collect::<Vec<_>>(),
        )
}

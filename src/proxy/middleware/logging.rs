// Request logging middleware
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Stamp each request with an id and log its outcome
pub async fn request_logging_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let mut response = next.run(request).await;

    tracing::info!(
        "[{}] {} {} -> {} ({} ms)",
        request_id,
        method,
        uri,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

// QubeTalk Handler
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::error::AppError;
use crate::proxy::server::AppState;

/// Relay one console call and mirror the upstream status and body
pub async fn handle_proxy(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let result = state.relay.handle(&headers, &body).await;
    state
        .stats
        .record(matches!(&result, Ok(reply) if reply.is_success()));

    let reply = result?;
    let status = StatusCode::from_u16(reply.status)
        .map_err(|e| AppError::Unknown(format!("Upstream status {}: {}", reply.status, e)))?;
    Ok((status, Json(reply.body)).into_response())
}

pub async fn handle_stats(State(state): State<AppState>) -> Response {
    let cached = state.relay.resolver().cache().len();
    Json(state.stats.snapshot(cached)).into_response()
}

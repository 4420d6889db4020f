use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Body returned to the console for every relay-level failure
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Persona store error: {0}")]
    Store(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        // Only configuration and input problems are described to the caller;
        // everything past composition is reported as a generic failure.
        let error = match &self {
            AppError::Config(msg) | AppError::InvalidInput(msg) => msg.clone(),
            other => {
                tracing::error!("Proxy failed: {}", other);
                "Proxy failed".to_string()
            }
        };
        (code, Json(ErrorBody { error })).into_response()
    }
}

// Implement alias for Result to simplify usage
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_config_error_is_described() {
        let response = AppError::Config("QUBETALK_API_URL is not configured".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "QUBETALK_API_URL is not configured");
    }

    #[tokio::test]
    async fn test_invalid_input_is_bad_request() {
        let response = AppError::InvalidInput("Invalid endpoint: /unknown".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid endpoint: /unknown");
    }

    #[tokio::test]
    async fn test_transport_errors_are_generic() {
        let response = AppError::Unknown("connection reset".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Proxy failed");
    }
}

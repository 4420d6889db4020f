use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::error::{AppError, AppResult};
use crate::proxy::handlers;
use crate::proxy::relay::QubeTalkRelay;
use crate::proxy::stats::StatsCounter;

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<QubeTalkRelay>,
    pub stats: Arc<StatsCounter>,
}

/// Build routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handlers::qubetalk::handle_proxy))
        .route("/qubetalk-proxy", post(handlers::qubetalk::handle_proxy))
        .route("/stats", get(handlers::qubetalk::handle_stats))
        .route("/healthz", get(health_check_handler))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            crate::proxy::middleware::request_logging_middleware,
        ))
        .layer(crate::proxy::middleware::cors_layer())
        .with_state(state)
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(
        host: &str,
        port: u16,
        state: AppState,
    ) -> AppResult<(Self, tokio::task::JoinHandle<()>)> {
        let app = build_router(state);

        // Bind address
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            AppError::Config(format!("Failed to bind address {}: {}", addr, e))
        })?;

        tracing::info!("QubeTalk proxy started at http://{}", addr);

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        // Start server in new task
        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("QubeTalk proxy stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((
            Self {
                shutdown_tx: Some(shutdown_tx),
            },
            handle,
        ))
    }

    /// Stop server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok"
    }))
    .into_response()
}

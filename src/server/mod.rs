//! HTTP surface over the session controller and report service.

pub mod owner;
pub mod routes;
pub mod state;

use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use tokio_util::sync::CancellationToken;

use crate::{error::CoreError, log_error, log_info};

pub use owner::{OwnerId, OWNER_HEADER};
pub use state::AppState;

const ENABLE_LOGS: bool = true;

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation", msg.clone()),
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            CoreError::Auth(msg) => (StatusCode::UNAUTHORIZED, "auth", msg.clone()),
            CoreError::Internal(err) => {
                log_error!("Request failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(serde_json::json!({ "error": kind, "message": message })),
        )
            .into_response()
    }
}

/// Build the axum Router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::session_routes())
        .merge(routes::analytics_routes())
        .with_state(state)
}

/// Serves until `shutdown` is cancelled.
pub async fn serve(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = state.settings.bind_addr.clone();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log_info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("HTTP server failed")?;

    log_info!("HTTP server stopped");
    Ok(())
}

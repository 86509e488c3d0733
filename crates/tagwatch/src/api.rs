//! HTTP API routes and handlers.
//!
//! A read-only view of what the tracker sees, organized by domain:
//! - `health` - Service health checks
//! - `devices` - Latest snapshot and per-device lookup
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use std::net::SocketAddr;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::SharedState;

pub mod devices;
pub mod error;
pub mod health;
pub mod openapi;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                   - Health check
/// /api
/// ├── /devices              - Latest snapshot
/// ├── /devices/{address}    - One device from the latest snapshot
/// └── /openapi.json         - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .nest("/devices", devices::router())
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the status API listener.
///
/// # Errors
///
/// Returns an error if the address is in use or otherwise cannot be bound.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind status API to {addr}"))?;
    info!("Status API listening on {}", addr);
    Ok(listener)
}

/// Serve the API on an already bound `listener` until `cancel` fires.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve(state: SharedState, listener: TcpListener, cancel: CancellationToken) -> anyhow::Result<()> {
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Status API stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bind_fails_when_address_in_use() {
        let taken = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = bind(addr).await.unwrap_err();
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve(AppState::new(), listener, cancel.clone()));

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), server).await;
        tokio_test::assert_ok!(result.unwrap().unwrap());
    }
}

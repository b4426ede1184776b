//! REST API over the device lifecycle operations.
//!
//! Routes:
//! - `POST /devices`, `GET /devices/active`
//! - `GET /devices/{id}` with `/measurements` and `/consumption` sub-resources
//! - `POST /devices/{id}/{start,stop,activate,deactivate,on,off}`
//! - `PUT /devices/{id}/model`, `DELETE /devices/{id}`
//! - `GET /simulations/interrupted`, `POST /simulations/recover`
//! - `GET /models`

mod error;
mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tracing::info;

use crate::devices::ModelCatalog;
use crate::sim::LifecycleManager;

pub use error::ApiError;
pub use types::{
    CreateDeviceRequest, DeviceResponse, ErrorResponse, InterruptedResponse, ModelResponse,
    RecoveryResponse, TransitionResponse, UpdateModelRequest,
};

/// Application state shared across all request handlers.
///
/// The lifecycle manager carries its own synchronization, so the state
/// itself needs no lock.
pub struct AppState {
    /// Lifecycle manager sharing the registry with the background loops.
    pub lifecycle: Arc<LifecycleManager>,
    /// Catalog listed by `GET /models`.
    pub catalog: Arc<ModelCatalog>,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/devices", post(handlers::create_device))
        .route("/devices/active", get(handlers::active_devices))
        .route(
            "/devices/{id}",
            get(handlers::get_device).delete(handlers::delete_device),
        )
        .route("/devices/{id}/measurements", get(handlers::get_measurements))
        .route("/devices/{id}/consumption", get(handlers::get_consumption))
        .route("/devices/{id}/model", put(handlers::update_model))
        .route("/devices/{id}/start", post(handlers::start))
        .route("/devices/{id}/stop", post(handlers::stop))
        .route("/devices/{id}/activate", post(handlers::activate))
        .route("/devices/{id}/deactivate", post(handlers::deactivate))
        .route("/devices/{id}/on", post(handlers::turn_on))
        .route("/devices/{id}/off", post(handlers::turn_off))
        .route("/simulations/interrupted", get(handlers::interrupted))
        .route("/simulations/recover", post(handlers::recover))
        .route("/models", get(handlers::list_models))
        .with_state(state)
}

/// Binds to the given address and serves the API until Ctrl-C.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `addr` - Socket address to bind to
///
/// # Errors
///
/// Returns an `io::Error` if the TCP listener cannot bind to `addr` or the
/// server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}

//! Gateway server setup
//!
//! Provides the WebSocket endpoint, the admin routes, and server startup.

mod admin;
mod handler;
mod state;

pub use admin::{AdminError, AdminResult, StatsResponse};
pub use handler::gateway_handler;
pub use state::GatewayState;

use axum::{
    routing::{delete, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use typing_common::{AppConfig, AppError};

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(admin::health_check))
        .route("/stats", get(admin::stats))
        .route("/typing", delete(admin::clear_all))
        .route(
            "/conversations/:conversation_id/typing",
            get(admin::list_typing).delete(admin::clear_conversation),
        )
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the gateway on an already bound listener
pub async fn serve(listener: TcpListener, state: GatewayState) -> Result<(), AppError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway listening on ws://{}/gateway", addr);
    }

    axum::serve(listener, create_app(state))
        .await
        .map_err(AppError::internal)
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.gateway.address();
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: addr.clone(),
            source,
        })?;

    serve(listener, GatewayState::from_config(config)).await
}

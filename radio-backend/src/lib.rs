//! radio-backend library
//!
//! Compiles station snapshots into Liquidsoap programs, controls running
//! engines over telnet and answers the engine's runtime callbacks.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod adapters;
pub mod api;
pub mod bridge;
pub mod error;
pub mod liquidsoap;

pub use adapters::AdapterRegistry;
pub use bridge::RuntimeBridge;
pub use error::{Error, Result};

/// Build identification captured by build.rs
pub const GIT_HASH: &str = env!("GIT_HASH");
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const BUILD_PROFILE: &str = env!("BUILD_PROFILE");

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<RuntimeBridge>,
}

impl AppState {
    pub fn new(bridge: Arc<RuntimeBridge>) -> Self {
        Self { bridge }
    }
}

/// Internal callback router plus health check
pub fn build_router(state: AppState) -> Router {
    use axum::routing::post;

    Router::new()
        .route(
            "/api/internal/:station_id/:endpoint",
            post(api::internal_callback),
        )
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

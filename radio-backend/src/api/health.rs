//! Liveness check for the callback listener

use axum::{routing::get, Json, Router};
use serde::Serialize;

use super::internal::CALLBACK_ENDPOINTS;
use crate::{AppState, BUILD_PROFILE, GIT_HASH};

/// What a supervisor needs to confirm the engine callbacks have somewhere to land
#[derive(Debug, Serialize)]
pub struct CallbackHealth {
    pub status: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_profile: &'static str,
    pub callback_route: &'static str,
    pub endpoints: &'static [&'static str],
}

/// GET /health
pub async fn health_check() -> Json<CallbackHealth> {
    Json(CallbackHealth {
        status: "accepting callbacks",
        version: env!("CARGO_PKG_VERSION"),
        git_hash: GIT_HASH,
        build_profile: BUILD_PROFILE,
        callback_route: "/api/internal/:station_id/:endpoint",
        endpoints: &CALLBACK_ENDPOINTS,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

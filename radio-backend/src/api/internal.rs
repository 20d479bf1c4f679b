//! Engine callback endpoints
//!
//! `POST /api/internal/:station_id/:endpoint` with a urlencoded form. Every
//! request carries the station's adapter API key as `api_auth`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use radio_common::StationRepository;
use tracing::{debug, warn};

use crate::error::Error;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InternalForm {
    pub api_auth: Option<String>,
    pub dj_user: Option<String>,
    pub dj_password: Option<String>,
    /// Defaults to true: the engine is the only caller
    pub as_autodj: Option<bool>,
}

#[derive(Debug)]
pub enum ApiError {
    Forbidden,
    UnknownEndpoint(String),
    Backend(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Backend(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Invalid API key".to_string()),
            ApiError::UnknownEndpoint(name) => {
                (StatusCode::NOT_FOUND, format!("Unknown endpoint: {}", name))
            }
            ApiError::Backend(Error::NotFound(what)) => (StatusCode::NOT_FOUND, what),
            ApiError::Backend(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", err)),
        };

        (status, message).into_response()
    }
}

/// Endpoints the generated engine program calls back into
pub const CALLBACK_ENDPOINTS: [&str; 4] = ["nextsong", "auth", "djon", "djoff"];

pub async fn internal_callback(
    State(state): State<AppState>,
    Path((station_id, endpoint)): Path<(i64, String)>,
    Form(form): Form<InternalForm>,
) -> Result<String, ApiError> {
    let station = state.bridge.repository().station(station_id).await.map_err(Error::from)?;

    let expected = station.adapter_api_key.as_deref().filter(|k| !k.is_empty());
    if expected.is_none() || form.api_auth.as_deref() != expected {
        warn!(station_id, endpoint = %endpoint, "Rejected internal call with bad API key");
        return Err(ApiError::Forbidden);
    }

    debug!(station_id, endpoint = %endpoint, "Internal callback");

    match endpoint.as_str() {
        "nextsong" => {
            let as_autodj = form.as_autodj.unwrap_or(true);
            Ok(state.bridge.next_song(&station, as_autodj).await?)
        }
        "auth" => {
            let user = form.dj_user.as_deref().unwrap_or_default();
            let password = form.dj_password.as_deref().unwrap_or_default();
            let allowed = state.bridge.authenticate(&station, user, password).await?;
            Ok(allowed.to_string())
        }
        "djon" => {
            state.bridge.toggle_live(&station, true).await?;
            Ok("received".to_string())
        }
        "djoff" => {
            state.bridge.toggle_live(&station, false).await?;
            Ok("received".to_string())
        }
        other => Err(ApiError::UnknownEndpoint(other.to_string())),
    }
}

//! HTTP API handlers for radio-backend

pub mod health;
pub mod internal;

pub use health::health_routes;
pub use internal::{internal_callback, ApiError};

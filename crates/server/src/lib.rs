//! Voicedesk server
//!
//! Channel adapters over the turn engine: the direct audio endpoint used by
//! browser clients and the telephony dialog endpoints driven by gateway
//! callbacks, plus call finalization and health.

pub mod http;
pub mod state;
pub mod telephony;
pub mod twiml;

pub use http::create_router;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use voicedesk_core::Error;

/// JSON-API boundary wrapper for the domain error.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) | Error::CompanyMismatch { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.0.is_client_fault() {
            tracing::debug!(error = %self.0, "request rejected");
        } else {
            tracing::error!(error = %self.0, "turn failed");
        }

        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

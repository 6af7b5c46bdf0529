//! Server and HTTP API errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use switchboard_core::RegistryError;
use thiserror::Error;

use crate::offer::OfferError;

/// Errors starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or serving the listener failed.
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
    /// The WebRTC stack could not be initialised.
    #[error("webrtc setup failed: {0}")]
    WebRtc(#[from] webrtc::Error),
}

/// Errors returned by HTTP handlers.
///
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Registry rejected the operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Request body was missing, malformed or incomplete.
    #[error("{0}")]
    BadRequest(String),
    /// Offer companion failure.
    #[error(transparent)]
    Offer(#[from] OfferError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Registry(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Registry(e) if e.is_conflict() => StatusCode::CONFLICT,
            Self::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Offer(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Offer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

//! Error responses.
//!
//! # Status Mapping
//! - Method not on the allow-list → 403
//! - Body missing, not JSON, or not a call → 400 (413 when over the limit)
//! - Call id already in flight → 409
//! - Pool not running or down → 503
//! - Upstream network, status or parse failure → 502
//! - Statistics bookkeeping failure → 500

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::statistics::StatisticsError;
use crate::upstream::DispatchError;

#[derive(Debug)]
pub enum ApiError {
    MethodNotAllowed,
    Body(JsonRejection),
    Dispatch(DispatchError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::FORBIDDEN,
            ApiError::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Body(_) => StatusCode::BAD_REQUEST,
            ApiError::Dispatch(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Dispatch(DispatchError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            // Id still in flight from an earlier call.
            ApiError::Dispatch(DispatchError::Statistics(StatisticsError::DuplicateOperation(_))) => {
                StatusCode::CONFLICT
            }
            ApiError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::MethodNotAllowed => "Method not allowed".to_string(),
            ApiError::Body(rejection) => rejection.body_text(),
            ApiError::Dispatch(e) => e.to_string(),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        ApiError::Dispatch(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.message(), "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self.message(), "Request rejected");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

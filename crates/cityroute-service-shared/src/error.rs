//! JSON error responses.
//!
//! Every failure leaves the service as `{"error": "<message>"}` with a status
//! derived from the library error kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use cityroute_lib::Error as LibError;

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// An HTTP status paired with the message sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub status: StatusCode,
    pub message: String,
}

impl ServiceError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request for invalid caller input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ServiceError {}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<LibError> for ServiceError {
    fn from(error: LibError) -> Self {
        from_lib_error(&error)
    }
}

/// Map a library error onto its HTTP status.
///
/// Caller-side problems (no graph loaded yet, a route that does not follow
/// the graph) are 400, missing documents are 404, and everything else is 500.
pub fn from_lib_error(error: &LibError) -> ServiceError {
    let status = match error {
        LibError::NotInitialized | LibError::InvalidRoute { .. } => StatusCode::BAD_REQUEST,
        LibError::NotFound { .. } => StatusCode::NOT_FOUND,
        LibError::StoreUnavailable { .. }
        | LibError::EmptyGraph
        | LibError::NoPath { .. }
        | LibError::DataIntegrity { .. }
        | LibError::Timeout { .. }
        | LibError::Render { .. }
        | LibError::Output { .. }
        | LibError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ServiceError::new(status, error.to_string())
}

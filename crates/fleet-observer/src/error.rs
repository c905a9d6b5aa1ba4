//! Error types for the HTTP layer.
//!
//! Every handler failure becomes an [`ObserverError`], which renders as a
//! JSON body `{"error": "...", "status": 404}` with the matching status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fleet_core::query::QueryError;
use serde::Serialize;

/// Errors surfaced by HTTP handlers and the live feed.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// A route, stop, or bus id that does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Missing or malformed request parameters.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A live event could not be encoded as JSON.
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ObserverError {
    /// The HTTP status this error is reported with.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryError> for ObserverError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound(what) => Self::NotFound(what),
            QueryError::InvalidQuery(msg) => Self::InvalidQuery(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

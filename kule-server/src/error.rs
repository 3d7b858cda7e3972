//! The error mapper: every failure a view can produce, and its HTTP rendering.
//!
//! Views return [`ApiError`] through their `Result`; it is rendered once, at the
//! outermost dispatch boundary, as `{"error": <status>, "message": <text>}` with a
//! fixed human message per status. Detail strings are logged, never sent.
//!
//! [`ServerError`] covers startup and serving failures of the binary.

use axum::{
    Json,
    extract::rejection::{BytesRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use kule_core::error::DocumentStoreError;

/// Errors surfaced to HTTP callers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed id, body or filter.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The collection is not whitelisted.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// No document for the given id, or no route for the path.
    #[error("not found: {0}")]
    NotFound(String),
    /// The path exists but the method does not.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    /// The request body exceeds the body limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    /// No view is implemented for the verb and cardinality.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// Unexpected store or transport fault.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors that stop the gateway from starting or serving.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Figment(#[from] figment::Error),
    #[error("store error: {0}")]
    Store(#[from] DocumentStoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to initialize logging: {0}")]
    Telemetry(String),
}

/// The body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: u16,
    pub message: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The fixed message sent for this error's status.
    pub fn message(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Bad request.",
            ApiError::Forbidden(_) => "Forbidden.",
            ApiError::NotFound(_) => "Document Not Found.",
            ApiError::MethodNotAllowed(_) => "Method Not Allowed.",
            ApiError::PayloadTooLarge(_) => "Payload Too Large.",
            ApiError::NotImplemented(_) => "Not Implemented.",
            ApiError::Internal(_) => "Internal Server Error.",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.status().as_u16(),
            message: self.message(),
        }
    }
}

impl From<DocumentStoreError> for ApiError {
    fn from(err: DocumentStoreError) -> Self {
        let detail = err.to_string();

        match err {
            DocumentStoreError::CollectionForbidden(_) => ApiError::Forbidden(detail),
            DocumentStoreError::DocumentNotFound(_, _) => ApiError::NotFound(detail),
            DocumentStoreError::InvalidId(_)
            | DocumentStoreError::InvalidDocument(_)
            | DocumentStoreError::InvalidFilter(_)
            | DocumentStoreError::DocumentAlreadyExists(_, _)
            | DocumentStoreError::Serialization(_) => ApiError::BadRequest(detail),
            DocumentStoreError::Initialization(_) | DocumentStoreError::Backend(_) => {
                ApiError::Internal(detail)
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    /// Maps an extractor rejection onto the envelope for its status.
    fn rejected(status: StatusCode, detail: String) -> Self {
        match status {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(detail),
            status if status.is_server_error() => ApiError::Internal(detail),
            _ => ApiError::BadRequest(detail),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

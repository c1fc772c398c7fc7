// HTTP API Error Types
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::{DatabaseError, RecordError};

/// HTTP API error with appropriate status codes and client-facing messages.
/// Every variant renders as `{"message": ...}`.
#[derive(Debug, PartialEq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 422 Unprocessable Entity (well-formed JSON that does not fit the resource)
    UnprocessableEntity(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::MethodNotAllowed(msg) => msg,
            ApiError::UnprocessableEntity(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({ "message": self.message() })
    }

    /// Short code for log lines
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        ApiError::MethodNotAllowed(message.into())
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    /// Log a data access failure and turn it into a 500. The underlying
    /// error text is appended only when `expose_details` is set.
    pub fn from_database(err: DatabaseError, expose_details: bool) -> Self {
        tracing::error!("Error executing database query: {}", err);
        if expose_details {
            ApiError::internal_server_error(format!("Internal Server Error: {}", err))
        } else {
            ApiError::internal_server_error("Internal Server Error")
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::InvalidJson(msg) => ApiError::invalid_json(msg),
            RecordError::UnknownField(field) => {
                tracing::debug!("Rejected update key: {}", field);
                ApiError::bad_request(RecordError::UnknownField(field).to_string())
            }
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::unprocessable_entity(e.body_text()),
            JsonRejection::JsonSyntaxError(e) => ApiError::invalid_json(e.body_text()),
            JsonRejection::MissingJsonContentType(e) => ApiError::invalid_json(e.body_text()),
            other => ApiError::bad_request(other.body_text()),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        tracing::debug!(code = self.error_code(), "{}", self.message());
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

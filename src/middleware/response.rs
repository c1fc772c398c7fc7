use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Successful API response: a JSON body with a status code (200 unless set)
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }
}

/// `{"message": ...}` body used for acknowledgements and empty listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub message: String,
}

impl ApiResponse<Message> {
    pub fn message(text: impl Into<String>) -> Self {
        Self::success(Message {
            message: text.into(),
        })
    }

    pub fn created_message(text: impl Into<String>) -> Self {
        Self::created(Message {
            message: text.into(),
        })
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        match serde_json::to_value(&self.data) {
            Ok(value) => (status, Json(value)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal Server Error: failed to serialize response" })),
                )
                    .into_response()
            }
        }
    }
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

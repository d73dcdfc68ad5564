use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::room::RoomError;

const LOG_TARGET: &str = "server::error";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            RoomError::Validation(message) => ApiError::BadRequest(message),
            RoomError::Forbidden(message) => ApiError::Forbidden(message.to_string()),
            RoomError::Storage(message) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message).into_response(),
            ApiError::Internal(message) => {
                error!(target = LOG_TARGET, %message, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

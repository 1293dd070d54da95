//! JSON error envelope shared by every handler.
//!
//! Body: `{"error": {"code": "INVALID_TRANSITION", "message": "invalid transition: PENDING -> COMPLETED"}}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ridehub_bookings::BookingError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    Booking(BookingError),
    Unauthorized,
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        ApiError::Booking(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Booking(BookingError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Booking(BookingError::ScheduleOutOfRange { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Booking(e) if e.is_rejection() => StatusCode::CONFLICT,
            ApiError::Booking(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Booking(e) => e.code(),
            ApiError::Unauthorized => "UNAUTHORIZED",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Booking(e) => e.to_string(),
            ApiError::Unauthorized => {
                "Unauthorized. Set 'Authorization: Bearer <admin-token>' header.".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "request failed: {}", self.message());
        }
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        });
        (status, Json(body)).into_response()
    }
}

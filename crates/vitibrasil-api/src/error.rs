//! API errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use vitibrasil::VitiError;

use crate::auth::AuthError;

/// Everything a request handler can fail with.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Year must be between {min} and {max}, got {year}")]
    YearOutOfRange { year: i64, min: u16, max: u16 },

    #[error("Invalid query: {0}")]
    BadQuery(String),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    Core(#[from] VitiError),
}

impl ApiError {
    pub fn year_out_of_range(year: i64) -> Self {
        ApiError::YearOutOfRange {
            year,
            min: *vitibrasil::YEAR_RANGE.start(),
            max: *vitibrasil::YEAR_RANGE.end(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::YearOutOfRange { .. } | ApiError::BadQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Core(e) if e.is_caller_error() => StatusCode::BAD_REQUEST,
            ApiError::Core(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

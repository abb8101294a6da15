//! Error handling - problem-style JSON responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;

/// Application-level error type rendered as a JSON problem body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    status: u16,
    title: &'a str,
    detail: &'a str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::BadRequest(detail) => ErrorBody {
                status: status.as_u16(),
                title: "Bad Request",
                detail,
            },
        };

        HttpResponse::build(status).json(body)
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use dodger_core::validation::ValidationError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Score submission failed one or more plausibility rules.
    Validation(Vec<ValidationError>),
    NotFound(String),
    /// The resource exists but belongs to someone else.
    Conflict(String),
    RateLimited(String),
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::RateLimited(m)
            | Self::Internal(m) => {
                write!(f, "{m}")
            },
            Self::Validation(errors) => write!(f, "Invalid score data ({} errors)", errors.len()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, serde_json::json!({ "error": m })),
            Self::Validation(errors) => {
                let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
                let codes: Vec<&str> = errors.iter().map(ValidationError::code).collect();
                (
                    StatusCode::BAD_REQUEST,
                    serde_json::json!({
                        "error": "Invalid score data",
                        "details": details,
                        "codes": codes,
                    }),
                )
            },
            Self::NotFound(m) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": m })),
            Self::Conflict(m) => (StatusCode::CONFLICT, serde_json::json!({ "error": m })),
            Self::RateLimited(m) => (
                StatusCode::TOO_MANY_REQUESTS,
                serde_json::json!({ "error": m }),
            ),
            Self::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": m }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

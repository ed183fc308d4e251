use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core::time::format_primitive;
use crate::services::attempt_error::AttemptError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    opens_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl ErrorResponse {
    fn plain(status: StatusCode, detail: String) -> Self {
        Self {
            status: status.as_u16(),
            detail,
            code: None,
            days_remaining: None,
            opens_at: None,
            limit: None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    BadRequest(String),
    TooManyRequests(&'static str),
    /// Domain rejection from the attempt lifecycle, reported with a stable code.
    Attempt(AttemptError),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::UnsupportedSeedVersion(_) => {
                Self::internal(err, "Attempt was started with an unknown seed version")
            }
            other => Self::Attempt(other),
        }
    }
}

fn attempt_status(err: &AttemptError) -> StatusCode {
    match err {
        AttemptError::NotFound(_) => StatusCode::NOT_FOUND,
        AttemptError::NotEnrolled
        | AttemptError::NotYetOpen { .. }
        | AttemptError::Closed
        | AttemptError::Forbidden => StatusCode::FORBIDDEN,
        AttemptError::AttemptLimitReached { .. }
        | AttemptError::CooldownActive { .. }
        | AttemptError::AttemptNotOngoing
        | AttemptError::AttemptExpired
        | AttemptError::AnswerChangeNotAllowed => StatusCode::CONFLICT,
        AttemptError::InvalidAnswer(_) => StatusCode::BAD_REQUEST,
        AttemptError::UnsupportedSeedVersion(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn attempt_body(err: &AttemptError) -> ErrorResponse {
    let mut body = ErrorResponse::plain(attempt_status(err), err.to_string());
    body.code = Some(err.code());
    match err {
        AttemptError::CooldownActive { days_remaining } => {
            body.days_remaining = Some(*days_remaining)
        }
        AttemptError::NotYetOpen { opens_at } => body.opens_at = Some(format_primitive(*opens_at)),
        AttemptError::AttemptLimitReached { limit } => body.limit = Some(*limit),
        _ => {}
    }
    body
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response =
                    (status, Json(ErrorResponse::plain(status, message.to_string())))
                        .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse::plain(status, message))).into_response()
            }
            ApiError::TooManyRequests(message) => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                (status, Json(ErrorResponse::plain(status, message.to_string()))).into_response()
            }
            ApiError::Attempt(err) => {
                tracing::debug!(code = err.code(), "Attempt request rejected");
                (attempt_status(&err), Json(attempt_body(&err))).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse::plain(status, message))).into_response()
            }
        }
    }
}

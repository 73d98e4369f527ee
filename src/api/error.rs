//! Error taxonomy and the single translation point from domain failures to
//! HTTP responses.

use super::validation::{FieldViolation, ValidationFailure};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Request body failed the operation schema.
    ValidationError,
    /// Passwords did not match or the current password is wrong.
    InvalidPassword,
    EmailAlreadyTaken,
    /// Domain rule failure: unknown user, store refused the change.
    UnprocessableEntity,
    /// The store refused the password change.
    InvalidCredentials,
    InternalError,
}

impl ErrorKind {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::ValidationError | Self::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidPassword => StatusCode::BAD_REQUEST,
            Self::EmailAlreadyTaken => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::EmailAlreadyTaken => "EMAIL_ALREADY_TAKEN",
            Self::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// JSON body of every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
    /// Every violated field, present only for `VALIDATION_ERROR`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldViolation>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("{0}")]
    InvalidPassword(&'static str),

    #[error("Email already taken")]
    EmailAlreadyTaken,

    #[error("{0}")]
    UnprocessableEntity(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Store or infrastructure failure; details are logged, not returned.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::InvalidPassword(_) => ErrorKind::InvalidPassword,
            Self::EmailAlreadyTaken => ErrorKind::EmailAlreadyTaken,
            Self::UnprocessableEntity(_) => ErrorKind::UnprocessableEntity,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = match self {
            Self::Validation(failure) => ErrorResponse {
                kind,
                message: failure.to_string(),
                errors: Some(failure.into_violations()),
            },
            Self::Internal(err) => {
                error!("Failed to handle user request: {err:#}");
                ErrorResponse {
                    kind,
                    message: "Internal server error".to_string(),
                    errors: None,
                }
            }
            other => {
                debug!(kind = kind.as_str(), "request rejected: {other}");
                ErrorResponse {
                    kind,
                    message: other.to_string(),
                    errors: None,
                }
            }
        };

        (kind.status(), Json(body)).into_response()
    }
}

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::payload::ApiResponse;

/// AppError
///
/// The single error type flowing through repositories, services and handlers.
/// Every variant carries enough information to render the standard JSON envelope
/// with the right HTTP status, so handlers can simply bubble errors up with `?`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing request fields.
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<String>,
    },

    /// Missing, malformed or expired token.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller's role may not perform the requested action.
    #[error("invalid role")]
    InvalidRole,

    /// Entity absent or soft-deleted.
    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    /// Duplicate unique key (email, course code, ...).
    #[error("{0}")]
    Conflict(String),

    /// Any persistence failure that is not a recognised not-found or conflict.
    #[error("database error: {0}")]
    Database(String),

    /// Unexpected fault, including a panic caught inside a unit of work.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn validation(message: impl Into<String>, details: Vec<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        AppError::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }

    /// HTTP status carried by the error. Conflicts and role violations answer
    /// 400, matching what existing clients already handle.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::InvalidRole | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code placed in the envelope's `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidRole => "INVALID_ROLE",
            AppError::NotFound { code, .. } => *code,
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) => "DB_ERROR",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Message safe to show to the client. Persistence and internal causes stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "database error".to_string(),
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn error_body(&self) -> Value {
        match self {
            AppError::Validation { details, .. } if !details.is_empty() => json!(details),
            other => json!({ "code": other.code() }),
        }
    }
}

/// Driver-level translation used by the Postgres repository: "no rows" becomes a
/// generic not-found, unique violations become conflicts, anything else is a
/// database error.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::not_found("NOT_FOUND", "record not found"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::conflict(format!("duplicate value: {}", db_err.message()))
            }
            other => {
                tracing::error!(error = ?other, "database failure");
                AppError::Database(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("invalid request body", vec![rejection.body_text()])
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation("invalid path parameter", vec![rejection.body_text()])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        } else {
            tracing::warn!(error = %self, code = self.code(), "request rejected");
        }

        ApiResponse {
            status: status.as_u16(),
            message: self.public_message(),
            data: Value::Null,
            error: Some(self.error_body()),
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(AppError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidRole.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::conflict("dup").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unauthorized("no").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::not_found("USER_NOT_FOUND", "user not found").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn database_details_are_not_exposed() {
        let err = AppError::Database("relation \"users\" does not exist".into());
        assert_eq!(err.public_message(), "database error");
        assert_eq!(err.code(), "DB_ERROR");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
    }
}

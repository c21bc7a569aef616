use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::types::InvalidValue;
use crate::services::credentials::CredentialError;
use crate::services::membership_status::StatusError;
use crate::services::payments::PaymentError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps key violations on writes to Conflict, everything else stays a database error
    pub fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Value is already in use".to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => AppError::Conflict(
                "Referenced record is missing or still in use".to_string(),
            ),
            _ => AppError::Database(err),
        }
    }
}

impl From<InvalidValue> for AppError {
    fn from(err: InvalidValue) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<StatusError> for AppError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::NotFound(member_id) => {
                AppError::NotFound(format!("member {}", member_id))
            }
            StatusError::Store(e) => AppError::Database(e),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::EmptyPassword => AppError::Validation(err.to_string()),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Status(e) => e.into(),
            PaymentError::Store(e) => AppError::Database(e),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_debug = format!("{:?}", self);

        let (status, error_message) = match self {
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            AppError::Session(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session error".to_string(),
            ),
            AppError::Template(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Rendering error".to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required. Please log in.".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have access to this page.".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %error_debug, "Request failed");
        }

        let body = Json(json!({
            "error": error_debug,
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("member 7".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (
                AppError::Database(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_status_error_mapping() {
        let err: AppError = StatusError::NotFound(42).into();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "member 42"));

        let err: AppError = StatusError::Store(sqlx::Error::PoolClosed).into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_invalid_value_is_validation() {
        let err: AppError = InvalidValue::new("age", "abc").into();
        assert!(matches!(err, AppError::Validation(msg) if msg == "invalid age: 'abc'"));
    }

    #[test]
    fn test_non_constraint_write_error_stays_database() {
        let err = AppError::from_write(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_payment_error_is_validation() {
        let err: AppError = PaymentError::AmountMismatch {
            expected: 1500,
            got: 100,
        }
        .into();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("1500")));
    }
}

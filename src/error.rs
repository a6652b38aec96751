use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

use crate::{
    clients::{mail::MailError, payment::PaymentError},
    domain::{cart::CartError, promotion::PromotionError},
    response::{ApiResponse, Meta},
    storage::StorageError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] DbErr),

    #[error("Payment provider error")]
    Payment(#[from] PaymentError),

    #[error("Email delivery error")]
    Mail(#[from] MailError),

    #[error("Storage error")]
    Storage(#[from] StorageError),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<PromotionError> for AppError {
    fn from(err: PromotionError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl AppError {
    /// Maps a unique-constraint violation on `constraint` to a 400 with
    /// `message`; any other error passes through.
    pub fn on_unique_violation(err: DbErr, constraint: &str, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains(constraint) => {
                AppError::BadRequest(message.to_string())
            }
            _ => AppError::OrmError(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_)
            | AppError::OrmError(_)
            | AppError::Payment(_)
            | AppError::Mail(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = status
            .canonical_reason()
            .unwrap_or("Error")
            .to_string();

        let body = ApiResponse {
            message,
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_errors_become_bad_requests() {
        let err: AppError = PromotionError::Expired.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "This promotion code has expired");
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::Internal(anyhow::anyhow!("secret connection string"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn non_unique_db_errors_pass_through() {
        let err = AppError::on_unique_violation(
            DbErr::Custom("boom".into()),
            "promotions_code_key",
            "Promotion code already exists",
        );
        assert!(matches!(err, AppError::OrmError(_)));
    }
}

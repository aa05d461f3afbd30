use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// No available license of the requested type. Expected during normal
    /// operation, not a fault.
    #[error("License type '{0}' is not available")]
    OutOfStock(String),

    #[error("{0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation { .. } | AppError::OutOfStock(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) | AppError::Pool(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::OutOfStock(_) => "OUT_OF_STOCK",
            AppError::Internal(_) | AppError::Database(_) | AppError::Pool(_) => "INTERNAL_ERROR",
        }
    }
}

/// True if the error is SQLite rejecting a UNIQUE/FK/CHECK constraint.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Storage details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let field = match &self {
            AppError::Validation { field, .. } => Some(field.as_str()),
            _ => None,
        };

        let body = ErrorBody {
            error: message,
            code: self.code(),
            field,
        };

        (status, Json(body)).into_response()
    }
}

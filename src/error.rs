use crate::models::ApiError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, RuntimeErr, SqlErr, SqlxError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Account already registered")]
    AlreadyRegistered,

    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("Not enough tickets")]
    InsufficientTickets,

    #[error("Too many requests")]
    RateLimited,

    #[error("Temporary failure: {0}")]
    Transient(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 调用方可以原样重试（锁超时、连接中断、并发冲突等）
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Transient(_) | AppError::RateLimited => true,
            AppError::DatabaseError(err) => is_transient_db_error(err),
            _ => false,
        }
    }
}

/// Postgres SQLSTATE: serialization_failure, deadlock_detected, lock_not_available, query_canceled
const TRANSIENT_SQLSTATES: [&str; 4] = ["40001", "40P01", "55P03", "57014"];

pub fn is_transient_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => {
            match e {
                SqlxError::Io(_) | SqlxError::PoolTimedOut | SqlxError::PoolClosed => true,
                SqlxError::Database(db) => db
                    .code()
                    .as_deref()
                    .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&code)),
                _ => false,
            }
        }
        _ => false,
    }
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyRegistered
            | AppError::AlreadyCheckedIn
            | AppError::InsufficientTickets => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(err) if is_transient_db_error(err) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                ("VALIDATION_ERROR", msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                ("AUTH_ERROR", msg.clone())
            }
            AppError::JwtError(err) => {
                log::warn!("Invalid identity token: {err}");
                ("AUTH_ERROR", "Invalid identity token".to_string())
            }
            AppError::Forbidden(msg) => {
                log::warn!("Forbidden access: {msg}");
                ("FORBIDDEN", msg.clone())
            }
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::AlreadyRegistered => ("ALREADY_REGISTERED", self.to_string()),
            AppError::AlreadyCheckedIn => ("ALREADY_CHECKED_IN", self.to_string()),
            AppError::InsufficientTickets => ("INSUFFICIENT_TICKETS", self.to_string()),
            AppError::RateLimited => {
                log::warn!("Rate limited request");
                ("RATE_LIMITED", self.to_string())
            }
            AppError::Transient(msg) => {
                log::warn!("Transient failure: {msg}");
                ("TRANSIENT_ERROR", "Temporary failure, please retry".to_string())
            }
            AppError::DatabaseError(err) if is_transient_db_error(err) => {
                log::warn!("Transient database error: {err}");
                ("TRANSIENT_ERROR", "Temporary failure, please retry".to_string())
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                ("DATABASE_ERROR", "Database error".to_string())
            }
            _ => {
                log::error!("Internal error: {self}");
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        let error = ApiError {
            code: error_code.to_string(),
            message,
            retryable: self.is_retryable(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": error
        }))
    }
}

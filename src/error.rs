//! Unified application error model and mapping helpers.
//! Every request path surfaces failures through `AppError`, which renders the
//! common `{status, message, errors?}` envelope with the right HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};

/// Set when `NODE_ENV=development`; internal errors then include diagnostic
/// detail in the response body instead of a bare message.
static DEV_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_dev_mode(enabled: bool) {
    DEV_MODE.store(enabled, Ordering::Relaxed);
}

pub fn dev_mode() -> bool {
    DEV_MODE.load(Ordering::Relaxed)
}

/// A single failed field from request validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new<S: Into<String>>(field: S, message: S) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, Clone)]
pub enum AppError {
    /// Body/param/query failed schema checks.
    Validation { message: String, errors: Vec<FieldError> },
    /// Username or email collision.
    Duplicate { message: String },
    /// Illegal role/manager transition (self role change, non-user target, ...).
    RoleTransition { message: String },
    AuthMissing { message: String },
    AuthMalformed { message: String },
    AuthExpired { message: String },
    AuthRevoked { message: String },
    /// Token verified but the principal no longer exists.
    AuthUnknownPrincipal { message: String },
    /// Login identifier/password mismatch.
    Credentials { message: String },
    /// The authorization engine denied the action.
    Forbidden { message: String },
    NotFound { message: String },
    RateLimited { message: String },
    Internal { message: String },
}

impl AppError {
    pub fn validation<S: Into<String>>(message: S, errors: Vec<FieldError>) -> Self {
        AppError::Validation { message: message.into(), errors }
    }
    pub fn duplicate<S: Into<String>>(message: S) -> Self {
        AppError::Duplicate { message: message.into() }
    }
    pub fn role_transition<S: Into<String>>(message: S) -> Self {
        AppError::RoleTransition { message: message.into() }
    }
    pub fn credentials() -> Self {
        AppError::Credentials { message: "Invalid credentials".into() }
    }
    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        AppError::Forbidden { message: message.into() }
    }
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        AppError::NotFound { message: message.into() }
    }
    pub fn rate_limited<S: Into<String>>(message: S) -> Self {
        AppError::RateLimited { message: message.into() }
    }
    pub fn internal<S: Into<String>>(message: S) -> Self {
        AppError::Internal { message: message.into() }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Duplicate { message }
            | AppError::RoleTransition { message }
            | AppError::AuthMissing { message }
            | AppError::AuthMalformed { message }
            | AppError::AuthExpired { message }
            | AppError::AuthRevoked { message }
            | AppError::AuthUnknownPrincipal { message }
            | AppError::Credentials { message }
            | AppError::Forbidden { message }
            | AppError::NotFound { message }
            | AppError::RateLimited { message }
            | AppError::Internal { message } => message.as_str(),
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::Duplicate { .. }
            | AppError::RoleTransition { .. } => StatusCode::BAD_REQUEST,
            AppError::AuthMissing { .. }
            | AppError::AuthMalformed { .. }
            | AppError::AuthExpired { .. }
            | AppError::AuthRevoked { .. }
            | AppError::AuthUnknownPrincipal { .. }
            | AppError::Credentials { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = match &self {
            AppError::Validation { message, errors } if !errors.is_empty() => {
                json!({"status": "error", "message": message, "errors": errors})
            }
            AppError::Internal { message } => {
                if dev_mode() {
                    json!({"status": "error", "message": message})
                } else {
                    json!({"status": "error", "message": "Internal Server Error"})
                }
            }
            other => json!({"status": "error", "message": other.message()}),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

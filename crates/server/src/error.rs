//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Every error body has the shape `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use pizza_orders_core::OrderValidationError;

use crate::auth::{GateFailure, TokenError};
use crate::db::RepositoryError;

/// Application-level error type for the order API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// An authorization gate stopped the request.
    #[error("Authorization failed: {0}")]
    Gate(#[from] GateFailure),

    /// The order failed validation.
    #[error("Invalid order: {0}")]
    Validation(#[from] OrderValidationError),

    /// Resource not found.
    #[error("Not found")]
    NotFound,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) => true,
            Self::Gate(GateFailure::Token(err)) => !err.is_authentication_failure(),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }

        match self {
            Self::Gate(GateFailure::Token(_)) => StatusCode::UNAUTHORIZED,
            Self::Gate(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Don't expose internal error details or which token check failed.
    fn message(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            Self::Gate(GateFailure::Token(_)) => "Invalid or missing access token".to_string(),
            Self::Gate(GateFailure::InsufficientScope(_)) => "Insufficient scope".to_string(),
            Self::Gate(GateFailure::EmailNotVerified) => "Email not verified".to_string(),
            Self::Gate(GateFailure::EmailVerificationUnavailable) => {
                "Email verification status unavailable".to_string()
            }
            Self::Gate(GateFailure::MachineGrantRequired) => {
                "Machine-to-machine token required".to_string()
            }
            Self::Validation(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::NotFound => "Not found".to_string(),
            Self::Database(_) => "Internal server error".to_string(),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        Self::Gate(GateFailure::Token(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if let Self::Gate(failure) = &self {
            tracing::info!(reason = %failure, "Request denied");
        }

        let body = ErrorBody {
            error: self.message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from the token subject.
///
/// Call this after successful authorization to associate errors with users.
pub fn set_sentry_user(subject: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(subject.to_string()),
            ..Default::default()
        }));
    });
}

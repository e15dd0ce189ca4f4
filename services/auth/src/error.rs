//! Error taxonomy of the authentication service and its HTTP mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::repositories::RepositoryError;

/// Errors surfaced by the authentication engine and account service.
///
/// Lookup and validation failures are folded into these coarse kinds before
/// they reach the transport layer; internal causes are logged, never echoed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Malformed, unsigned, unknown, rotated or expired refresh token
    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,

    /// Transient backend failure
    #[error("storage unavailable")]
    StorageUnavailable,

    /// No live account with the given identity
    #[error("account not found")]
    AccountNotFound,

    /// Registration or email change collided with an existing account
    #[error("email already registered")]
    EmailAlreadyExists,

    /// Request payload failed validation
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid access token
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated, but the role does not allow the operation
    #[error("forbidden")]
    Forbidden,

    /// Any other internal failure
    #[error("internal server error")]
    Internal,
}

impl AuthError {
    /// Log a store failure with its cause and fold it into `StorageUnavailable`
    pub fn storage(context: &str, err: RepositoryError) -> Self {
        error!("{}: {}", context, err);
        AuthError::StorageUnavailable
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::AccountNotFound => StatusCode::NOT_FOUND,
            AuthError::EmailAlreadyExists => StatusCode::CONFLICT,
            AuthError::StorageUnavailable | AuthError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for service results
pub type AuthResult<T> = Result<T, AuthError>;

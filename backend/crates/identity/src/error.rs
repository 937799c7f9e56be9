//! Identity Error Types
//!
//! The error taxonomy of the identity subsystem. Every variant carries a
//! stable machine-readable code surfaced to clients alongside a human
//! message; none of them is retried automatically.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Identity-specific result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity-specific error variants
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Bad identifier or password. Deliberately generic: never reveals
    /// whether the identifier existed.
    #[error("Invalid credentials")]
    InvalidCredential,

    /// Signature, issuer/audience or expiry failure on a presented token
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    /// Submitted TOTP code did not verify
    #[error("Invalid verification code")]
    InvalidOtp,

    /// Submitted recovery code matched no unused entry
    #[error("Invalid recovery code")]
    InvalidRecoveryCode,

    /// MFA operation attempted on an account without MFA enabled
    #[error("Multi-factor authentication is not enabled")]
    MfaNotEnabled,

    /// Setup verification attempted before any secret was generated
    #[error("Multi-factor authentication has not been set up")]
    MfaNotEnrolled,

    /// Registration with an email that is already taken
    #[error("Email is already registered")]
    EmailTaken,

    /// Registration with a username that is already taken
    #[error("Username is already taken")]
    UsernameTaken,

    /// Authenticated subject no longer resolves to a principal
    #[error("Principal not found")]
    PrincipalNotFound,

    /// Secret present without recovery hashes or vice versa. A data bug,
    /// never a user error.
    #[error("Inconsistent MFA state on principal record")]
    InconsistentMfaState,

    /// Request payload failed validation
    #[error("{0}")]
    Validation(AppError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        use IdentityError::*;
        match self {
            InvalidCredential => "INVALID_CREDENTIAL",
            InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            InvalidOtp => "INVALID_OTP",
            InvalidRecoveryCode => "INVALID_RECOVERY_CODE",
            MfaNotEnabled => "MFA_NOT_ENABLED",
            MfaNotEnrolled => "MFA_NOT_ENROLLED",
            EmailTaken => "EMAIL_TAKEN",
            UsernameTaken => "USERNAME_TAKEN",
            PrincipalNotFound => "PRINCIPAL_NOT_FOUND",
            InconsistentMfaState => "INCONSISTENT_MFA_STATE",
            Validation(_) => "VALIDATION_FAILED",
            Database(_) | Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        use IdentityError::*;
        match self {
            InvalidCredential | InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            InvalidOtp | InvalidRecoveryCode | MfaNotEnabled | MfaNotEnrolled => {
                StatusCode::BAD_REQUEST
            }
            EmailTaken | UsernameTaken => StatusCode::CONFLICT,
            PrincipalNotFound => StatusCode::NOT_FOUND,
            Validation(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST)
            }
            InconsistentMfaState | Database(_) | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Kernel ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        use IdentityError::*;
        match self {
            InvalidCredential | InvalidOrExpiredToken => ErrorKind::Unauthorized,
            InvalidOtp | InvalidRecoveryCode | MfaNotEnabled | MfaNotEnrolled => {
                ErrorKind::BadRequest
            }
            EmailTaken | UsernameTaken => ErrorKind::Conflict,
            PrincipalNotFound => ErrorKind::NotFound,
            Validation(err) => err.kind(),
            InconsistentMfaState | Database(_) | Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            IdentityError::Database(e) => {
                tracing::error!(error = %e, "Identity database error");
            }
            IdentityError::Internal(msg) => {
                tracing::error!(message = %msg, "Identity internal error");
            }
            IdentityError::InconsistentMfaState => {
                tracing::error!("Principal row with partial MFA state");
            }
            IdentityError::InvalidCredential => {
                tracing::warn!("Invalid login attempt");
            }
            IdentityError::InvalidOrExpiredToken => {
                tracing::debug!("Rejected token");
            }
            _ => {
                tracing::debug!(error = %self, "Identity error");
            }
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        self.log();

        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<AppError> for IdentityError {
    fn from(err: AppError) -> Self {
        if err.is_client_error() {
            IdentityError::Validation(err)
        } else {
            IdentityError::Internal(err.to_string())
        }
    }
}

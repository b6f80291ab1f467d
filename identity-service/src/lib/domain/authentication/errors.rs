use auth::PasswordError;
use auth::PasswordPolicyError;
use auth::SecretGenerationError;
use thiserror::Error;

use crate::domain::authentication::models::FailureReason;
use crate::user::errors::DisplayNameError;
use crate::user::errors::EmailError;
use crate::user::models::AuthProvider;

/// Infrastructure failures of a persistence or cache adapter.
///
/// These are the only fatal outcomes; they propagate unchanged to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Failures of the OAuth CSRF state store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateStoreError {
    #[error("Failed to generate state: {0}")]
    Generation(String),
}

/// Malformed input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid display name: {0}")]
    InvalidDisplayName(#[from] DisplayNameError),

    #[error("{0}")]
    WeakPassword(#[from] PasswordPolicyError),

    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFailure {
    InvalidAccessToken,
    UnknownRefreshToken,
    RevokedRefreshToken,
    ExpiredRefreshToken,
    RotationConflict,
    OwnerUnavailable,
}

impl TokenFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenFailure::InvalidAccessToken => "invalid_access_token",
            TokenFailure::UnknownRefreshToken => "unknown_refresh_token",
            TokenFailure::RevokedRefreshToken => "revoked_refresh_token",
            TokenFailure::ExpiredRefreshToken => "expired_refresh_token",
            TokenFailure::RotationConflict => "rotation_conflict",
            TokenFailure::OwnerUnavailable => "owner_unavailable",
        }
    }
}

/// Internal reason behind an authentication failure.
///
/// Logged, never shown: every credential failure renders the same message,
/// and so does every token failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationFailure {
    Credentials(FailureReason),
    Token(TokenFailure),
}

impl AuthenticationFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            AuthenticationFailure::Credentials(reason) => reason.as_str(),
            AuthenticationFailure::Token(failure) => failure.as_str(),
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            AuthenticationFailure::Credentials(_) => "Invalid email or password",
            AuthenticationFailure::Token(_) => "Invalid or expired token",
        }
    }
}

/// Duplicate identity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("This email is registered with {existing} sign-in")]
    EmailExistsDifferentProvider { existing: AuthProvider },
}

impl ConflictError {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictError::EmailAlreadyRegistered => "EMAIL_EXISTS",
            ConflictError::EmailExistsDifferentProvider { .. } => "EMAIL_EXISTS_DIFFERENT_PROVIDER",
        }
    }
}

/// Failures of the OAuth handshake.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OAuthError {
    #[error("Invalid or expired OAuth state")]
    InvalidState,

    #[error("Provider returned an error: {0}")]
    ProviderDenied(String),

    #[error("Missing authorization code")]
    MissingCode,

    #[error("Code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Invalid provider configuration: {0}")]
    Misconfigured(String),
}

impl OAuthError {
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidState => "INVALID_STATE",
            _ => "OAUTH_FAILED",
        }
    }
}

/// Top-level error for all authentication operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{}", .0.public_message())]
    Authentication(AuthenticationFailure),

    #[error("Account temporarily locked due to too many failed attempts")]
    AccountLocked,

    #[error("{0}")]
    Conflict(#[from] ConflictError),

    #[error("{0}")]
    OAuth(#[from] OAuthError),

    // Infrastructure errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn credentials(reason: FailureReason) -> Self {
        AuthError::Authentication(AuthenticationFailure::Credentials(reason))
    }

    pub fn token(failure: TokenFailure) -> Self {
        AuthError::Authentication(AuthenticationFailure::Token(failure))
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<SecretGenerationError> for AuthError {
    fn from(err: SecretGenerationError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("Blocking task failed: {}", err))
    }
}

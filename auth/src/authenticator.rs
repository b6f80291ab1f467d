use chrono::Duration;
use chrono::Utc;

use crate::jwt::AccessClaims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::password::PasswordPolicy;
use crate::password::PasswordPolicyError;
use crate::refresh::RefreshSecret;
use crate::refresh::SecretGenerationError;

/// Authentication coordinator combining password verification and token handling.
///
/// Owns the password hasher and policy, the access-token signer and the
/// access-token lifetime. Stateless apart from configuration, so one
/// instance can be shared behind an `Arc`.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    password_policy: PasswordPolicy,
    jwt_handler: JwtHandler,
    access_token_ttl: Duration,
}

/// A freshly signed access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

impl Authenticator {
    pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

    /// Create a new authenticator with default hashing cost and a
    /// 15 minute access-token lifetime.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    pub fn new(jwt_secret: &[u8]) -> Self {
        Self {
            password_hasher: PasswordHasher::new(),
            password_policy: PasswordPolicy::new(),
            jwt_handler: JwtHandler::new(jwt_secret),
            access_token_ttl: Duration::minutes(Self::DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
        }
    }

    pub fn with_password_hasher(mut self, password_hasher: PasswordHasher) -> Self {
        self.password_hasher = password_hasher;
        self
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    /// Check a password against the strength policy.
    ///
    /// # Errors
    /// * `PasswordPolicyError` - Lists every unmet requirement
    pub fn check_password_policy(&self, password: &str) -> Result<(), PasswordPolicyError> {
        self.password_policy.check(password)
    }

    /// Hash a password for storage.
    ///
    /// CPU-bound by design; async callers should run it on a blocking thread.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Verify a password against a stored hash.
    ///
    /// # Errors
    /// * `PasswordError` - Stored hash is malformed
    pub fn verify_password(
        &self,
        password: &str,
        stored_hash: &str,
    ) -> Result<bool, PasswordError> {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Verify credentials and issue an access token.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Password verification failed
    /// * `JwtError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        user_id: &str,
        email: &str,
    ) -> Result<AccessToken, AuthenticationError> {
        if !self.password_hasher.verify(password, stored_hash)? {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.issue_access_token(user_id, email)?)
    }

    /// Issue an access token without password verification.
    ///
    /// Used after sign-up, refresh and OAuth login, where identity has
    /// already been established by other means.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token generation failed
    pub fn issue_access_token(&self, user_id: &str, email: &str) -> Result<AccessToken, JwtError> {
        let claims = AccessClaims::new(user_id, email, Utc::now(), self.access_token_ttl);
        let token = self.jwt_handler.encode(&claims)?;

        Ok(AccessToken {
            token,
            expires_in: claims.lifetime_seconds(),
        })
    }

    /// Validate an access token and return its claims.
    ///
    /// # Errors
    /// * `TokenExpired`, `InvalidToken`, `WrongTokenType` - Token must be rejected
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.jwt_handler.decode_access(token)
    }

    /// Generate a new opaque refresh secret.
    ///
    /// # Errors
    /// * `GenerationFailed` - OS random source unavailable
    pub fn generate_refresh_secret(&self) -> Result<RefreshSecret, SecretGenerationError> {
        RefreshSecret::generate()
    }
}

use async_trait::async_trait;
use auth::RefreshSecret;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::authentication::errors::AuthError;
use crate::domain::authentication::errors::OAuthError;
use crate::domain::authentication::errors::RepositoryError;
use crate::domain::authentication::errors::StateStoreError;
use crate::domain::authentication::models::AuthSession;
use crate::domain::authentication::models::ClientContext;
use crate::domain::authentication::models::LoginAttempt;
use crate::domain::authentication::models::OAuthCallback;
use crate::domain::authentication::models::OAuthIdentity;
use crate::domain::authentication::models::OAuthLogin;
use crate::domain::authentication::models::RefreshToken;
use crate::domain::authentication::models::RefreshedSession;
use crate::domain::authentication::models::SignInCommand;
use crate::domain::authentication::models::SignUpCommand;
use crate::user::models::EmailAddress;
use crate::user::models::OAuthProviderKind;
use crate::user::models::User;
use crate::user::models::UserId;

/// Port for authentication and session lifecycle operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a password user and open a session.
    ///
    /// # Arguments
    /// * `command` - Raw email, password, confirmation and optional display name
    /// * `client` - Caller IP and user agent
    ///
    /// # Returns
    /// New user with an access token and a refresh secret
    ///
    /// # Errors
    /// * `Validation` - Malformed email or display name, weak or mismatched password
    /// * `Conflict` - Email already registered
    /// * `Repository` - Database operation failed
    async fn sign_up(
        &self,
        command: SignUpCommand,
        client: ClientContext,
    ) -> Result<AuthSession, AuthError>;

    /// Authenticate with email and password, subject to lockout.
    ///
    /// Every attempt is recorded in the audit log.
    ///
    /// # Errors
    /// * `Authentication` - Unknown email, inactive account, OAuth account or wrong password
    /// * `AccountLocked` - Too many recent failures
    /// * `Repository` - Database operation failed
    async fn sign_in(
        &self,
        command: SignInCommand,
        client: ClientContext,
    ) -> Result<AuthSession, AuthError>;

    /// Exchange a refresh secret for a new token pair, revoking the old token.
    ///
    /// # Errors
    /// * `Authentication` - Unknown, revoked or expired token, lost rotation
    ///   race, or owner missing or inactive
    /// * `Repository` - Database operation failed
    async fn refresh(
        &self,
        secret: RefreshSecret,
        client: ClientContext,
    ) -> Result<RefreshedSession, AuthError>;

    /// Revoke a refresh token. Unknown or already revoked secrets are not an error.
    ///
    /// # Errors
    /// * `Repository` - Database operation failed
    async fn sign_out(&self, secret: RefreshSecret) -> Result<(), AuthError>;

    /// Start an OAuth login: issue a CSRF state and build the provider URL.
    ///
    /// # Returns
    /// Absolute provider authorization URL
    ///
    /// # Errors
    /// * `StateStore` - State could not be issued
    /// * `OAuth` - Provider URL could not be built
    async fn oauth_authorize(&self) -> Result<String, AuthError>;

    /// Complete an OAuth login.
    ///
    /// The state is consumed before anything else, so it is single-use even
    /// when the rest of the callback fails.
    ///
    /// # Errors
    /// * `OAuth` - Invalid state, provider error, missing code or failed exchange
    /// * `Conflict` - Email belongs to an account with a different provider
    /// * `Authentication` - Resolved account is inactive
    /// * `Repository` - Database operation failed
    async fn oauth_callback(
        &self,
        callback: OAuthCallback,
        client: ClientContext,
    ) -> Result<OAuthLogin, AuthError>;

    /// Resolve the active user behind an access token.
    ///
    /// # Errors
    /// * `Authentication` - Invalid or expired token, or owner missing or inactive
    /// * `Repository` - Database operation failed
    async fn current_user(&self, access_token: &str) -> Result<User, AuthError>;
}

/// Persistence operations for user aggregate.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `UniqueViolation` - Email or provider id already taken
    /// * `Database` - Database operation failed
    async fn create(&self, user: User) -> Result<User, RepositoryError>;

    /// Retrieve user by identifier.
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    /// * `CorruptRecord` - Stored row violates the credential invariant
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    /// Retrieve user by normalized email.
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError>;

    /// Retrieve user by external provider identity.
    async fn find_by_provider_id(
        &self,
        provider: OAuthProviderKind,
        provider_id: &str,
    ) -> Result<Option<User>, RepositoryError>;
}

/// Persistence operations for refresh tokens.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync + 'static {
    /// Persist a new refresh token.
    ///
    /// # Errors
    /// * `UniqueViolation` - Token hash already stored
    /// * `Database` - Database operation failed
    async fn create(&self, token: RefreshToken) -> Result<RefreshToken, RepositoryError>;

    /// Retrieve token by SHA-256 hash of its secret, whatever its state.
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, RepositoryError>;

    /// Revoke `presented_id` and insert `replacement` atomically.
    ///
    /// The revocation is conditional on the presented token still being
    /// valid; when another caller got there first nothing is written.
    ///
    /// # Returns
    /// `true` if this caller won the rotation
    async fn rotate(
        &self,
        presented_id: Uuid,
        replacement: RefreshToken,
    ) -> Result<bool, RepositoryError>;

    /// Revoke the token with this hash if it is still unrevoked.
    ///
    /// # Returns
    /// `true` if a token was revoked by this call
    async fn revoke(&self, token_hash: &str) -> Result<bool, RepositoryError>;

    /// Revoke every unrevoked token of a user.
    ///
    /// # Returns
    /// Number of tokens revoked
    async fn revoke_all_for_user(&self, user_id: &UserId) -> Result<u64, RepositoryError>;

    /// Delete tokens that expired before `cutoff`.
    ///
    /// # Returns
    /// Number of tokens deleted
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Append-only sign-in audit log.
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync + 'static {
    async fn record(&self, attempt: LoginAttempt) -> Result<(), RepositoryError>;

    /// Count failed attempts for a user at or after `since`.
    async fn count_recent_failures(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError>;

    /// Delete attempts recorded before `cutoff`.
    ///
    /// # Returns
    /// Number of attempts deleted
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Single-use CSRF state values for the OAuth handshake.
#[async_trait]
pub trait OAuthStateStore: Send + Sync + 'static {
    /// Generate and remember a new unguessable state.
    async fn issue(&self) -> Result<String, StateStoreError>;

    /// Check and delete a state in one step.
    ///
    /// # Returns
    /// `true` iff the state was present and unexpired; at most one caller
    /// ever sees `true` for a given state
    async fn consume(&self, state: &str) -> Result<bool, StateStoreError>;

    /// Drop expired states.
    ///
    /// # Returns
    /// Number of states removed
    async fn sweep_expired(&self) -> Result<usize, StateStoreError>;
}

/// External identity provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync + 'static {
    /// Provider authorization URL carrying `state`.
    ///
    /// # Errors
    /// * `Misconfigured` - Configured endpoint is not a valid URL
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError>;

    /// Exchange an authorization code for the user's identity.
    ///
    /// # Errors
    /// * `ExchangeFailed` - Token or profile request failed or returned no email
    async fn exchange_code(&self, code: &str) -> Result<OAuthIdentity, OAuthError>;
}

use std::sync::Arc;

use async_trait::async_trait;
use auth::AccessToken;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::RefreshSecret;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::OnceCell;

use crate::domain::authentication::errors::AuthError;
use crate::domain::authentication::errors::OAuthError;
use crate::domain::authentication::errors::RepositoryError;
use crate::domain::authentication::errors::TokenFailure;
use crate::domain::authentication::errors::ValidationError;
use crate::domain::authentication::identity::IdentityResolver;
use crate::domain::authentication::ledger::RefreshTokenLedger;
use crate::domain::authentication::lockout::LockoutGuard;
use crate::domain::authentication::models::AuthSession;
use crate::domain::authentication::models::ClientContext;
use crate::domain::authentication::models::FailureReason;
use crate::domain::authentication::models::LoginAttempt;
use crate::domain::authentication::models::OAuthCallback;
use crate::domain::authentication::models::OAuthLogin;
use crate::domain::authentication::models::RefreshedSession;
use crate::domain::authentication::models::SignInCommand;
use crate::domain::authentication::models::SignUpCommand;
use crate::domain::authentication::ports::AuthServicePort;
use crate::domain::authentication::ports::LoginAttemptRepository;
use crate::domain::authentication::ports::OAuthProvider;
use crate::domain::authentication::ports::OAuthStateStore;
use crate::domain::authentication::ports::RefreshTokenRepository;
use crate::domain::authentication::ports::UserRepository;
use crate::user::models::DisplayName;
use crate::user::models::EmailAddress;
use crate::user::models::User;
use crate::user::models::UserId;

const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Domain service implementation for authentication operations.
///
/// Orchestrates identity lookup, lockout, password verification and the
/// refresh-token ledger. Argon2 work runs on the blocking pool.
pub struct AuthService<UR, TR, LR, SS, OP>
where
    UR: UserRepository,
    TR: RefreshTokenRepository,
    LR: LoginAttemptRepository,
    SS: OAuthStateStore,
    OP: OAuthProvider,
{
    identities: IdentityResolver<UR>,
    ledger: RefreshTokenLedger<TR>,
    lockout: LockoutGuard<LR>,
    state_store: Arc<SS>,
    oauth_provider: Arc<OP>,
    authenticator: Arc<Authenticator>,
    decoy_hash: OnceCell<String>,
}

impl<UR, TR, LR, SS, OP> AuthService<UR, TR, LR, SS, OP>
where
    UR: UserRepository,
    TR: RefreshTokenRepository,
    LR: LoginAttemptRepository,
    SS: OAuthStateStore,
    OP: OAuthProvider,
{
    /// Create a new authentication service with injected dependencies.
    ///
    /// # Arguments
    /// * `identities` - Account lookup and creation
    /// * `ledger` - Refresh token persistence and rotation
    /// * `lockout` - Sign-in audit log and lockout policy
    /// * `state_store` - OAuth CSRF state store
    /// * `oauth_provider` - External identity provider
    /// * `authenticator` - Password hashing and access-token signing
    pub fn new(
        identities: IdentityResolver<UR>,
        ledger: RefreshTokenLedger<TR>,
        lockout: LockoutGuard<LR>,
        state_store: Arc<SS>,
        oauth_provider: Arc<OP>,
        authenticator: Arc<Authenticator>,
    ) -> Self {
        Self {
            identities,
            ledger,
            lockout,
            state_store,
            oauth_provider,
            authenticator,
            decoy_hash: OnceCell::new(),
        }
    }

    /// Delete refresh tokens and audit rows past their retention.
    ///
    /// # Returns
    /// Number of tokens and attempts deleted
    pub async fn purge_stale_records(
        &self,
        expired_tokens_before: DateTime<Utc>,
        attempts_before: DateTime<Utc>,
    ) -> Result<(u64, u64), RepositoryError> {
        let tokens = self.ledger.purge_expired(expired_tokens_before).await?;
        let attempts = self.lockout.purge_older_than(attempts_before).await?;

        Ok((tokens, attempts))
    }

    fn issue_access_token(&self, user: &User) -> Result<AccessToken, AuthError> {
        self.authenticator
            .issue_access_token(&user.id.to_string(), user.email.as_str())
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn open_session(
        &self,
        user: User,
        client: &ClientContext,
    ) -> Result<AuthSession, AuthError> {
        let access_token = self.issue_access_token(&user)?;
        let refresh_secret = self.ledger.issue(&user.id, client).await?;

        Ok(AuthSession {
            user,
            access_token,
            refresh_secret,
        })
    }

    /// Record a failed sign-in and build the uniform error for it.
    async fn reject_sign_in(
        &self,
        user_id: Option<UserId>,
        email: &str,
        client: &ClientContext,
        reason: FailureReason,
    ) -> AuthError {
        tracing::warn!(
            user_id = ?user_id.map(|id| id.to_string()),
            ip = %client.ip_address,
            %reason,
            "Sign-in failed"
        );

        match self
            .lockout
            .record(LoginAttempt::failed(user_id, email, client, reason))
            .await
        {
            Ok(()) => AuthError::credentials(reason),
            Err(e) => e.into(),
        }
    }

    /// Verify `password` against a throwaway hash. Unknown emails pay the
    /// same Argon2 cost as wrong passwords.
    async fn verify_against_decoy(&self, password: String) {
        let decoy = match self
            .decoy_hash
            .get_or_try_init(|| self.hash_password(DECOY_PASSWORD.to_string()))
            .await
        {
            Ok(hash) => hash.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to prepare decoy hash");
                return;
            }
        };

        let authenticator = Arc::clone(&self.authenticator);
        let outcome =
            tokio::task::spawn_blocking(move || authenticator.verify_password(&password, &decoy))
                .await;
        if let Ok(Err(e)) = outcome {
            tracing::warn!(error = %e, "Decoy verification failed");
        }
    }

    async fn rotate_session(
        &self,
        secret: RefreshSecret,
        client: &ClientContext,
    ) -> Result<RefreshedSession, AuthError> {
        let presented = self.ledger.validate(&secret).await?;

        let user = self
            .identities
            .find_by_id(&presented.user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::token(TokenFailure::OwnerUnavailable))?;

        let refresh_secret = self.ledger.rotate(&presented, client).await?;
        let access_token = self.issue_access_token(&user)?;

        tracing::debug!(user_id = %user.id, "Refresh token rotated");

        Ok(RefreshedSession {
            access_token,
            refresh_secret,
        })
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let authenticator = Arc::clone(&self.authenticator);
        let hash = tokio::task::spawn_blocking(move || authenticator.hash_password(&password))
            .await??;

        Ok(hash)
    }
}

#[async_trait]
impl<UR, TR, LR, SS, OP> AuthServicePort for AuthService<UR, TR, LR, SS, OP>
where
    UR: UserRepository,
    TR: RefreshTokenRepository,
    LR: LoginAttemptRepository,
    SS: OAuthStateStore,
    OP: OAuthProvider,
{
    async fn sign_up(
        &self,
        command: SignUpCommand,
        client: ClientContext,
    ) -> Result<AuthSession, AuthError> {
        let email = EmailAddress::new(command.email).map_err(ValidationError::from)?;
        self.authenticator
            .check_password_policy(&command.password)
            .map_err(ValidationError::from)?;
        if command.password != command.password_confirm {
            return Err(ValidationError::PasswordMismatch.into());
        }
        let display_name =
            DisplayName::parse_optional(command.display_name).map_err(ValidationError::from)?;

        let password_hash = self.hash_password(command.password).await?;
        let user = self
            .identities
            .register(User::with_password(email, display_name, password_hash))
            .await?;

        tracing::info!(user_id = %user.id, "User signed up");

        self.open_session(user, &client).await
    }

    async fn sign_in(
        &self,
        command: SignInCommand,
        client: ClientContext,
    ) -> Result<AuthSession, AuthError> {
        let SignInCommand {
            email: submitted_email,
            password,
        } = command;

        // A malformed email cannot match an account.
        let user = match EmailAddress::new(submitted_email.clone()) {
            Ok(email) => self.identities.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(user) = user else {
            self.verify_against_decoy(password).await;
            return Err(self
                .reject_sign_in(None, &submitted_email, &client, FailureReason::UserNotFound)
                .await);
        };

        if self.lockout.is_locked(&user.id).await? {
            self.lockout
                .record(LoginAttempt::failed(
                    Some(user.id),
                    &submitted_email,
                    &client,
                    FailureReason::AccountLocked,
                ))
                .await?;
            tracing::warn!(
                user_id = %user.id,
                ip = %client.ip_address,
                "Sign-in rejected, account locked"
            );
            return Err(AuthError::AccountLocked);
        }

        if !user.is_active {
            return Err(self
                .reject_sign_in(
                    Some(user.id),
                    &submitted_email,
                    &client,
                    FailureReason::AccountInactive,
                )
                .await);
        }

        let Some(stored_hash) = user.password_hash().map(str::to_owned) else {
            return Err(self
                .reject_sign_in(
                    Some(user.id),
                    &submitted_email,
                    &client,
                    FailureReason::WrongProvider,
                )
                .await);
        };

        let authenticator = Arc::clone(&self.authenticator);
        let (user_id, email) = (user.id.to_string(), user.email.to_string());
        let outcome = tokio::task::spawn_blocking(move || {
            authenticator.authenticate(&password, &stored_hash, &user_id, &email)
        })
        .await?;

        let access_token = match outcome {
            Ok(token) => token,
            Err(AuthenticationError::InvalidCredentials) => {
                return Err(self
                    .reject_sign_in(
                        Some(user.id),
                        &submitted_email,
                        &client,
                        FailureReason::InvalidPassword,
                    )
                    .await);
            }
            Err(AuthenticationError::PasswordError(e)) => return Err(e.into()),
            Err(AuthenticationError::JwtError(e)) => return Err(AuthError::Internal(e.to_string())),
        };

        self.lockout
            .record(LoginAttempt::succeeded(user.id, &submitted_email, &client))
            .await?;
        let refresh_secret = self.ledger.issue(&user.id, &client).await?;

        tracing::info!(user_id = %user.id, "User signed in");

        Ok(AuthSession {
            user,
            access_token,
            refresh_secret,
        })
    }

    async fn refresh(
        &self,
        secret: RefreshSecret,
        client: ClientContext,
    ) -> Result<RefreshedSession, AuthError> {
        self.rotate_session(secret, &client)
            .await
            .inspect_err(|e| {
                if let AuthError::Authentication(failure) = e {
                    tracing::debug!(
                        reason = failure.reason(),
                        ip = %client.ip_address,
                        "Refresh rejected"
                    );
                }
            })
    }

    async fn sign_out(&self, secret: RefreshSecret) -> Result<(), AuthError> {
        if self.ledger.revoke(&secret).await? {
            tracing::info!("Refresh token revoked on sign-out");
        }

        Ok(())
    }

    async fn oauth_authorize(&self) -> Result<String, AuthError> {
        let state = self.state_store.issue().await?;

        Ok(self.oauth_provider.authorization_url(&state)?)
    }

    async fn oauth_callback(
        &self,
        callback: OAuthCallback,
        client: ClientContext,
    ) -> Result<OAuthLogin, AuthError> {
        if !self.state_store.consume(&callback.state).await? {
            tracing::warn!(ip = %client.ip_address, "OAuth callback with invalid state");
            return Err(OAuthError::InvalidState.into());
        }

        if let Some(error) = callback.error {
            return Err(OAuthError::ProviderDenied(error).into());
        }

        let code = callback
            .code
            .filter(|code| !code.is_empty())
            .ok_or(OAuthError::MissingCode)?;

        let identity = self.oauth_provider.exchange_code(&code).await?;
        let (user, created) = self.identities.resolve_oauth(identity).await?;

        tracing::info!(user_id = %user.id, created, "OAuth sign-in");

        let session = self.open_session(user, &client).await?;

        Ok(OAuthLogin { session, created })
    }

    async fn current_user(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self
            .authenticator
            .validate_access_token(access_token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AuthError::token(TokenFailure::InvalidAccessToken)
            })?;

        let user_id = UserId::from_string(&claims.sub)
            .map_err(|_| AuthError::token(TokenFailure::InvalidAccessToken))?;

        self.identities
            .find_by_id(&user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::token(TokenFailure::OwnerUnavailable))
    }
}

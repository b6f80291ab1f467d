use std::sync::Arc;

use crate::domain::authentication::errors::AuthError;
use crate::domain::authentication::errors::ConflictError;
use crate::domain::authentication::errors::RepositoryError;
use crate::domain::authentication::errors::ValidationError;
use crate::domain::authentication::models::FailureReason;
use crate::domain::authentication::models::OAuthIdentity;
use crate::domain::authentication::ports::UserRepository;
use crate::user::models::AuthProvider;
use crate::user::models::DisplayName;
use crate::user::models::EmailAddress;
use crate::user::models::OAuthProviderKind;
use crate::user::models::User;
use crate::user::models::UserId;

/// Maps credentials and external identities to user accounts.
pub struct IdentityResolver<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
}

impl<UR> IdentityResolver<UR>
where
    UR: UserRepository,
{
    pub fn new(repository: Arc<UR>) -> Self {
        Self { repository }
    }

    pub async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.repository.find_by_id(id).await
    }

    pub async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, RepositoryError> {
        self.repository.find_by_email(email).await
    }

    /// Persist a new password user.
    ///
    /// The pre-check gives the common case a clean error; the unique index
    /// decides concurrent sign-ups.
    ///
    /// # Errors
    /// * `Conflict(EmailAlreadyRegistered)` - Email is taken
    pub async fn register(&self, user: User) -> Result<User, AuthError> {
        if self.repository.find_by_email(&user.email).await?.is_some() {
            return Err(ConflictError::EmailAlreadyRegistered.into());
        }

        match self.repository.create(user).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::UniqueViolation(_)) => {
                Err(ConflictError::EmailAlreadyRegistered.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find or create the account for an external identity.
    ///
    /// Lookup is by provider id first. A new account is only created when
    /// no account, of any provider, holds the email; accounts are never
    /// linked across providers.
    ///
    /// # Returns
    /// The active user and whether it was created by this call
    ///
    /// # Errors
    /// * `Validation` - Provider returned an unusable email
    /// * `Conflict(EmailExistsDifferentProvider)` - Email belongs to another account
    /// * `Authentication` - Account exists but is inactive
    pub async fn resolve_oauth(&self, identity: OAuthIdentity) -> Result<(User, bool), AuthError> {
        if let Some(user) = self
            .repository
            .find_by_provider_id(identity.provider, &identity.provider_id)
            .await?
        {
            return Self::ensure_active(user).map(|user| (user, false));
        }

        let email = EmailAddress::new(identity.email).map_err(ValidationError::from)?;

        if let Some(existing) = self.repository.find_by_email(&email).await? {
            return Err(Self::different_provider(existing.auth_provider()));
        }

        // Providers may send names we would reject on sign-up; drop them.
        let display_name = DisplayName::parse_optional(identity.display_name).unwrap_or(None);
        let user = User::with_oauth(
            email.clone(),
            display_name,
            identity.provider,
            identity.provider_id.clone(),
        );

        match self.repository.create(user).await {
            Ok(user) => {
                tracing::info!(
                    user_id = %user.id,
                    provider = %user.auth_provider(),
                    "Created OAuth user"
                );
                Ok((user, true))
            }
            Err(RepositoryError::UniqueViolation(constraint)) => {
                tracing::debug!(%constraint, "Concurrent OAuth sign-up, resolving winner");
                self.resolve_lost_race(identity.provider, &identity.provider_id, &email)
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_lost_race(
        &self,
        provider: OAuthProviderKind,
        provider_id: &str,
        email: &EmailAddress,
    ) -> Result<(User, bool), AuthError> {
        if let Some(user) = self
            .repository
            .find_by_provider_id(provider, provider_id)
            .await?
        {
            return Self::ensure_active(user).map(|user| (user, false));
        }

        let existing = self
            .repository
            .find_by_email(email)
            .await?
            .map(|user| user.auth_provider())
            .unwrap_or(AuthProvider::Password);

        Err(Self::different_provider(existing))
    }

    fn ensure_active(user: User) -> Result<User, AuthError> {
        if user.is_active {
            Ok(user)
        } else {
            Err(AuthError::credentials(FailureReason::AccountInactive))
        }
    }

    fn different_provider(existing: AuthProvider) -> AuthError {
        ConflictError::EmailExistsDifferentProvider { existing }.into()
    }
}

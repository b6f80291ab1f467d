use std::sync::Arc;

use auth::RefreshSecret;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::authentication::errors::AuthError;
use crate::domain::authentication::errors::RepositoryError;
use crate::domain::authentication::errors::TokenFailure;
use crate::domain::authentication::models::ClientContext;
use crate::domain::authentication::models::RefreshToken;
use crate::domain::authentication::models::SessionPolicy;
use crate::domain::authentication::ports::RefreshTokenRepository;
use crate::user::models::UserId;

/// Issues, validates, rotates and revokes refresh tokens.
///
/// Plaintext secrets leave this type only as return values; the repository
/// sees hashes.
pub struct RefreshTokenLedger<TR>
where
    TR: RefreshTokenRepository,
{
    repository: Arc<TR>,
    policy: SessionPolicy,
}

impl<TR> RefreshTokenLedger<TR>
where
    TR: RefreshTokenRepository,
{
    pub fn new(repository: Arc<TR>, policy: SessionPolicy) -> Self {
        Self { repository, policy }
    }

    /// Mint and store a new refresh token for `user_id`.
    pub async fn issue(
        &self,
        user_id: &UserId,
        client: &ClientContext,
    ) -> Result<RefreshSecret, AuthError> {
        let secret = RefreshSecret::generate()?;
        let token = RefreshToken::issue(*user_id, &secret, self.policy.refresh_token_ttl, client);

        self.repository.create(token).await?;

        Ok(secret)
    }

    /// Look up a presented secret and check that it is still valid.
    ///
    /// A revoked token being presented again is treated as possible theft:
    /// it is logged, and with `revoke_all_on_reuse` every session of the
    /// owner is revoked.
    pub async fn validate(&self, secret: &RefreshSecret) -> Result<RefreshToken, AuthError> {
        let token = self
            .repository
            .find_by_hash(&secret.hash())
            .await?
            .ok_or(AuthError::token(TokenFailure::UnknownRefreshToken))?;

        if token.is_revoked() {
            tracing::warn!(
                user_id = %token.user_id,
                token_id = %token.id,
                "Revoked refresh token presented again"
            );

            if self.policy.revoke_all_on_reuse {
                let revoked = self.repository.revoke_all_for_user(&token.user_id).await?;
                tracing::warn!(
                    user_id = %token.user_id,
                    revoked,
                    "Revoked all refresh tokens after reuse"
                );
            }

            return Err(AuthError::token(TokenFailure::RevokedRefreshToken));
        }

        if token.is_expired(Utc::now()) {
            return Err(AuthError::token(TokenFailure::ExpiredRefreshToken));
        }

        Ok(token)
    }

    /// Replace a validated token with a new one.
    ///
    /// Of several concurrent rotations of the same token exactly one wins;
    /// the others fail with `RotationConflict`.
    pub async fn rotate(
        &self,
        presented: &RefreshToken,
        client: &ClientContext,
    ) -> Result<RefreshSecret, AuthError> {
        let secret = RefreshSecret::generate()?;
        let replacement = RefreshToken::issue(
            presented.user_id,
            &secret,
            self.policy.refresh_token_ttl,
            client,
        );

        if !self.repository.rotate(presented.id, replacement).await? {
            tracing::warn!(
                user_id = %presented.user_id,
                token_id = %presented.id,
                "Refresh token rotation lost to a concurrent request"
            );
            return Err(AuthError::token(TokenFailure::RotationConflict));
        }

        Ok(secret)
    }

    /// Revoke the token behind `secret`, if any.
    ///
    /// # Returns
    /// `true` if a live token was revoked
    pub async fn revoke(&self, secret: &RefreshSecret) -> Result<bool, RepositoryError> {
        self.repository.revoke(&secret.hash()).await
    }

    pub async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.repository.delete_expired(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;
    use mockall::mock;
    use mockall::predicate::*;
    use uuid::Uuid;

    use super::*;

    mock! {
        pub TestTokenRepository {}

        #[async_trait]
        impl RefreshTokenRepository for TestTokenRepository {
            async fn create(&self, token: RefreshToken) -> Result<RefreshToken, RepositoryError>;
            async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, RepositoryError>;
            async fn rotate(&self, presented_id: Uuid, replacement: RefreshToken) -> Result<bool, RepositoryError>;
            async fn revoke(&self, token_hash: &str) -> Result<bool, RepositoryError>;
            async fn revoke_all_for_user(&self, user_id: &UserId) -> Result<u64, RepositoryError>;
            async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;
        }
    }

    fn stored(secret: &RefreshSecret) -> RefreshToken {
        RefreshToken::issue(
            UserId::new(),
            secret,
            Duration::days(7),
            &ClientContext::unknown(),
        )
    }

    #[tokio::test]
    async fn test_issue_stores_hash_only() {
        let mut repository = MockTestTokenRepository::new();
        repository
            .expect_create()
            .withf(|token| token.token_hash.len() == 64 && token.revoked_at.is_none())
            .times(1)
            .returning(Ok);

        let ledger = RefreshTokenLedger::new(Arc::new(repository), SessionPolicy::default());
        let user_id = UserId::new();

        let secret = ledger
            .issue(&user_id, &ClientContext::unknown())
            .await
            .unwrap();

        assert_eq!(secret.expose().len(), 43);
    }

    #[tokio::test]
    async fn test_validate_unknown_token() {
        let mut repository = MockTestTokenRepository::new();
        repository.expect_find_by_hash().returning(|_| Ok(None));

        let ledger = RefreshTokenLedger::new(Arc::new(repository), SessionPolicy::default());

        let result = ledger.validate(&RefreshSecret::from_presented("nope")).await;
        assert_eq!(
            result.unwrap_err(),
            AuthError::token(TokenFailure::UnknownRefreshToken)
        );
    }

    #[tokio::test]
    async fn test_validate_expired_token() {
        let secret = RefreshSecret::from_presented("old");
        let mut token = stored(&secret);
        token.expires_at = Utc::now() - Duration::seconds(1);

        let mut repository = MockTestTokenRepository::new();
        repository
            .expect_find_by_hash()
            .withf({
                let expected = secret.hash();
                move |hash| hash == expected
            })
            .returning(move |_| Ok(Some(token.clone())));

        let ledger = RefreshTokenLedger::new(Arc::new(repository), SessionPolicy::default());

        assert_eq!(
            ledger.validate(&secret).await.unwrap_err(),
            AuthError::token(TokenFailure::ExpiredRefreshToken)
        );
    }

    #[tokio::test]
    async fn test_reuse_does_not_revoke_family_by_default() {
        let secret = RefreshSecret::from_presented("reused");
        let mut token = stored(&secret);
        token.revoked_at = Some(Utc::now());

        let mut repository = MockTestTokenRepository::new();
        repository
            .expect_find_by_hash()
            .returning(move |_| Ok(Some(token.clone())));
        repository.expect_revoke_all_for_user().times(0);

        let ledger = RefreshTokenLedger::new(Arc::new(repository), SessionPolicy::default());

        assert_eq!(
            ledger.validate(&secret).await.unwrap_err(),
            AuthError::token(TokenFailure::RevokedRefreshToken)
        );
    }

    #[tokio::test]
    async fn test_reuse_revokes_all_when_enabled() {
        let secret = RefreshSecret::from_presented("reused");
        let mut token = stored(&secret);
        token.revoked_at = Some(Utc::now());
        let owner = token.user_id;

        let mut repository = MockTestTokenRepository::new();
        repository
            .expect_find_by_hash()
            .returning(move |_| Ok(Some(token.clone())));
        repository
            .expect_revoke_all_for_user()
            .with(eq(owner))
            .times(1)
            .returning(|_| Ok(3));

        let policy = SessionPolicy {
            revoke_all_on_reuse: true,
            ..SessionPolicy::default()
        };
        let ledger = RefreshTokenLedger::new(Arc::new(repository), policy);

        assert_eq!(
            ledger.validate(&secret).await.unwrap_err(),
            AuthError::token(TokenFailure::RevokedRefreshToken)
        );
    }

    #[tokio::test]
    async fn test_rotate_keeps_owner_and_reports_lost_race() {
        let presented = stored(&RefreshSecret::from_presented("current"));
        let owner = presented.user_id;
        let presented_id = presented.id;

        let mut repository = MockTestTokenRepository::new();
        repository
            .expect_rotate()
            .withf(move |id, replacement| *id == presented_id && replacement.user_id == owner)
            .times(2)
            .returning({
                let mut won = false;
                move |_, _| {
                    let first = !won;
                    won = true;
                    Ok(first)
                }
            });

        let ledger = RefreshTokenLedger::new(Arc::new(repository), SessionPolicy::default());
        let client = ClientContext::unknown();

        assert!(ledger.rotate(&presented, &client).await.is_ok());
        assert_eq!(
            ledger.rotate(&presented, &client).await.unwrap_err(),
            AuthError::token(TokenFailure::RotationConflict)
        );
    }
}

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::domain::authentication::errors::RepositoryError;
use crate::domain::authentication::models::LockoutPolicy;
use crate::domain::authentication::models::LoginAttempt;
use crate::domain::authentication::ports::LoginAttemptRepository;
use crate::user::models::UserId;

/// Sliding-window lockout over the sign-in audit log.
///
/// Lockout is derived by counting recent failures; nothing is stored on the
/// user, so a lock lifts by itself once old failures leave the window.
pub struct LockoutGuard<LR>
where
    LR: LoginAttemptRepository,
{
    repository: Arc<LR>,
    policy: LockoutPolicy,
}

impl<LR> LockoutGuard<LR>
where
    LR: LoginAttemptRepository,
{
    pub fn new(repository: Arc<LR>, policy: LockoutPolicy) -> Self {
        Self { repository, policy }
    }

    /// `true` when the user has at least `max_failed_attempts` failures
    /// inside the window ending now.
    pub async fn is_locked(&self, user_id: &UserId) -> Result<bool, RepositoryError> {
        let since = Utc::now() - self.policy.window;
        let failures = self
            .repository
            .count_recent_failures(user_id, since)
            .await?;

        Ok(failures >= self.policy.max_failed_attempts)
    }

    pub async fn record(&self, attempt: LoginAttempt) -> Result<(), RepositoryError> {
        self.repository.record(attempt).await
    }

    /// Drop audit rows older than `cutoff`. Only rows outside the lockout
    /// window should ever be purged.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.repository.delete_older_than(cutoff).await
    }
}

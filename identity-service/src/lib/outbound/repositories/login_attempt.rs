use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use super::map_sqlx_error;
use crate::domain::authentication::errors::RepositoryError;
use crate::domain::authentication::models::LoginAttempt;
use crate::domain::authentication::ports::LoginAttemptRepository;
use crate::domain::user::models::UserId;

pub struct PostgresLoginAttemptRepository {
    pool: PgPool,
}

impl PostgresLoginAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginAttemptRepository for PostgresLoginAttemptRepository {
    async fn record(&self, attempt: LoginAttempt) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (id, user_id, email, ip_address, user_agent,
                                        success, failure_reason, attempted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.user_id.map(|id| id.0))
        .bind(&attempt.email)
        .bind(&attempt.ip_address)
        .bind(attempt.user_agent.as_deref())
        .bind(attempt.success)
        .bind(attempt.failure_reason.map(|reason| reason.as_str()))
        .bind(attempt.attempted_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn count_recent_failures(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM login_attempts
            WHERE user_id = $1 AND success = FALSE AND attempted_at >= $2
            "#,
        )
        .bind(user_id.0)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE attempted_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

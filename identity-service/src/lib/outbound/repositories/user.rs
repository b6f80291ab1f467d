use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use super::map_sqlx_error;
use crate::domain::authentication::errors::RepositoryError;
use crate::domain::authentication::ports::UserRepository;
use crate::domain::user::models::AuthProvider;
use crate::domain::user::models::Credential;
use crate::domain::user::models::DisplayName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::OAuthProviderKind;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

const USER_COLUMNS: &str = "id, email, password_hash, display_name, auth_provider, \
                            provider_id, is_active, created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    display_name: Option<String>,
    auth_provider: String,
    provider_id: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: String| RepositoryError::CorruptRecord(format!("user {}: {}", id, e));

        Ok(User {
            id: UserId(id),
            email: EmailAddress::new(row.email).map_err(|e| corrupt(e.to_string()))?,
            display_name: DisplayName::parse_optional(row.display_name)
                .map_err(|e| corrupt(e.to_string()))?,
            credential: Credential::from_columns(
                &row.auth_provider,
                row.password_hash,
                row.provider_id,
            )
            .map_err(|e| corrupt(e.to_string()))?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, display_name, auth_provider,
                               provider_id, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.0)
        .bind(user.email.as_str())
        .bind(user.password_hash())
        .bind(user.display_name.as_ref().map(DisplayName::as_str))
        .bind(user.auth_provider().as_str())
        .bind(user.credential.provider_id())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_provider_id(
        &self,
        provider: OAuthProviderKind,
        provider_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM users WHERE auth_provider = $1 AND provider_id = $2",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(AuthProvider::OAuth(provider).as_str())
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(User::try_from).transpose()
    }
}

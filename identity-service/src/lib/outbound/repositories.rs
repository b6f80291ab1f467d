pub mod login_attempt;
pub mod refresh_token;
pub mod user;

use sqlx::Error as SqlxError;

use crate::domain::authentication::errors::RepositoryError;

/// Map a driver error, keeping the violated constraint name for unique violations.
pub(crate) fn map_sqlx_error(err: SqlxError) -> RepositoryError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return RepositoryError::UniqueViolation(
                db_err.constraint().unwrap_or("unknown").to_string(),
            );
        }
    }
    RepositoryError::Database(err.to_string())
}

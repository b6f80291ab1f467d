use std::fmt;

use auth::AccessToken;
use auth::RefreshSecret;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::user::models::OAuthProviderKind;
use crate::user::models::User;
use crate::user::models::UserId;

const MAX_USER_AGENT_LENGTH: usize = 500;

/// Failed-attempt threshold and sliding window for sign-in lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: i64,
    pub window: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            window: Duration::minutes(15),
        }
    }
}

/// Refresh-token lifetime and reuse handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub refresh_token_ttl: Duration,
    /// Revoke every live token of a user when one of their revoked tokens is replayed.
    pub revoke_all_on_reuse: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            refresh_token_ttl: Duration::days(7),
            revoke_all_on_reuse: false,
        }
    }
}

/// Where a request came from. Recorded with attempts and tokens for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub ip_address: String,
    pub user_agent: Option<String>,
}

impl ClientContext {
    /// User agents longer than 500 characters are truncated.
    pub fn new(ip_address: impl Into<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent
                .map(|agent| agent.chars().take(MAX_USER_AGENT_LENGTH).collect()),
        }
    }

    pub fn unknown() -> Self {
        Self::new("unknown", None)
    }
}

/// Raw sign-up input. Validated by the service.
#[derive(Clone)]
pub struct SignUpCommand {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub display_name: Option<String>,
}

impl fmt::Debug for SignUpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpCommand")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Raw sign-in input.
#[derive(Clone)]
pub struct SignInCommand {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignInCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInCommand")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Query parameters delivered by the provider to the callback endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthCallback {
    pub state: String,
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Persisted refresh token. Only the SHA-256 of the secret is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl RefreshToken {
    pub fn issue(
        user_id: UserId,
        secret: &RefreshSecret,
        ttl: Duration,
        client: &ClientContext,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: secret.hash(),
            expires_at: now + ttl,
            created_at: now,
            revoked_at: None,
            user_agent: client.user_agent.clone(),
            ip_address: Some(client.ip_address.clone()),
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Valid iff not revoked and not yet expired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }
}

/// Why a sign-in attempt failed. Stored verbatim in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    UserNotFound,
    AccountLocked,
    AccountInactive,
    WrongProvider,
    InvalidPassword,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::UserNotFound => "user_not_found",
            FailureReason::AccountLocked => "account_locked",
            FailureReason::AccountInactive => "account_inactive",
            FailureReason::WrongProvider => "wrong_provider",
            FailureReason::InvalidPassword => "invalid_password",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only sign-in audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub id: Uuid,
    pub user_id: Option<UserId>,
    pub email: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    pub attempted_at: DateTime<Utc>,
}

impl LoginAttempt {
    pub fn succeeded(user_id: UserId, email: &str, client: &ClientContext) -> Self {
        Self::new(Some(user_id), email, client, None)
    }

    pub fn failed(
        user_id: Option<UserId>,
        email: &str,
        client: &ClientContext,
        reason: FailureReason,
    ) -> Self {
        Self::new(user_id, email, client, Some(reason))
    }

    fn new(
        user_id: Option<UserId>,
        email: &str,
        client: &ClientContext,
        failure_reason: Option<FailureReason>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            email: email.to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            success: failure_reason.is_none(),
            failure_reason,
            attempted_at: Utc::now(),
        }
    }
}

/// Identity asserted by an external provider after a code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthIdentity {
    pub provider: OAuthProviderKind,
    pub provider_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// A signed-in user with a fresh token pair.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: AccessToken,
    pub refresh_secret: RefreshSecret,
}

/// Token pair produced by a refresh rotation.
#[derive(Debug, Clone)]
pub struct RefreshedSession {
    pub access_token: AccessToken,
    pub refresh_secret: RefreshSecret,
}

/// Outcome of an OAuth callback.
#[derive(Debug, Clone)]
pub struct OAuthLogin {
    pub session: AuthSession,
    /// A new account was created for this identity.
    pub created: bool,
}

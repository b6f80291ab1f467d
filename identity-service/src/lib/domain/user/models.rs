use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::errors::CredentialError;
use crate::user::errors::DisplayNameError;
use crate::user::errors::EmailError;
use crate::user::errors::UserIdError;

/// User aggregate entity.
///
/// The credential is a sum type, so a user always has exactly one of a
/// password hash or an external provider id, matching its provider tag.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub display_name: Option<DisplayName>,
    pub credential: Credential,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new password-authenticated user.
    pub fn with_password(
        email: EmailAddress,
        display_name: Option<DisplayName>,
        password_hash: String,
    ) -> Self {
        Self::new(
            email,
            display_name,
            Credential::Password {
                hash: password_hash,
            },
        )
    }

    /// Build a new user authenticated by an external OAuth provider.
    pub fn with_oauth(
        email: EmailAddress,
        display_name: Option<DisplayName>,
        provider: OAuthProviderKind,
        provider_id: String,
    ) -> Self {
        Self::new(
            email,
            display_name,
            Credential::OAuth {
                provider,
                provider_id,
            },
        )
    }

    fn new(email: EmailAddress, display_name: Option<DisplayName>, credential: Credential) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            display_name,
            credential,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn auth_provider(&self) -> AuthProvider {
        self.credential.provider()
    }

    /// Stored password hash, present only for password users.
    pub fn password_hash(&self) -> Option<&str> {
        match &self.credential {
            Credential::Password { hash } => Some(hash),
            Credential::OAuth { .. } => None,
        }
    }
}

/// How a user proves identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Password {
        hash: String,
    },
    OAuth {
        provider: OAuthProviderKind,
        provider_id: String,
    },
}

impl Credential {
    pub fn provider(&self) -> AuthProvider {
        match self {
            Credential::Password { .. } => AuthProvider::Password,
            Credential::OAuth { provider, .. } => AuthProvider::OAuth(*provider),
        }
    }

    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Credential::Password { .. } => None,
            Credential::OAuth { provider_id, .. } => Some(provider_id),
        }
    }

    /// Rebuild a credential from its stored columns.
    ///
    /// # Errors
    /// * `UnknownProvider` - Provider tag is not recognised
    /// * `PasswordMismatch` / `OAuthMismatch` - Columns contradict the tag
    pub fn from_columns(
        provider: &str,
        password_hash: Option<String>,
        provider_id: Option<String>,
    ) -> Result<Self, CredentialError> {
        match (provider.parse::<AuthProvider>()?, password_hash, provider_id) {
            (AuthProvider::Password, Some(hash), None) => Ok(Credential::Password { hash }),
            (AuthProvider::Password, _, _) => {
                Err(CredentialError::PasswordMismatch(provider.to_string()))
            }
            (AuthProvider::OAuth(kind), None, Some(provider_id)) => Ok(Credential::OAuth {
                provider: kind,
                provider_id,
            }),
            (AuthProvider::OAuth(_), _, _) => {
                Err(CredentialError::OAuthMismatch(provider.to_string()))
            }
        }
    }
}

/// External identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProviderKind {
    Google,
}

impl OAuthProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProviderKind::Google => "google",
        }
    }
}

/// Provider tag stored with every user: `password` or `oauth:<provider>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthProvider {
    Password,
    OAuth(OAuthProviderKind),
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Password => "password",
            AuthProvider::OAuth(OAuthProviderKind::Google) => "oauth:google",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProvider {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(AuthProvider::Password),
            "oauth:google" => Ok(AuthProvider::OAuth(OAuthProviderKind::Google)),
            other => Err(CredentialError::UnknownProvider(other.to_string())),
        }
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Normalized to trimmed lower-case so lookups and uniqueness are
/// case-insensitive, then validated with an RFC 5322 parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated, normalized email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let normalized = email.trim().to_lowercase();
        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Optional human-readable name, 1-100 characters after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    const MAX_LENGTH: usize = 100;

    /// # Errors
    /// * `Empty` - Nothing left after trimming
    /// * `TooLong` - More than 100 characters
    pub fn new(name: String) -> Result<Self, DisplayNameError> {
        let trimmed = name.trim();
        let length = trimmed.chars().count();

        if length == 0 {
            Err(DisplayNameError::Empty)
        } else if length > Self::MAX_LENGTH {
            Err(DisplayNameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Parse an optional name; blank input means no name.
    ///
    /// # Errors
    /// * `TooLong` - More than 100 characters
    pub fn parse_optional(name: Option<String>) -> Result<Option<Self>, DisplayNameError> {
        match name {
            Some(name) if !name.trim().is_empty() => Self::new(name).map(Some),
            _ => Ok(None),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

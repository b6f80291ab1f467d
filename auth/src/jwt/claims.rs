use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Token type tag carried in the `type` claim.
///
/// Unknown tags deserialize to `Other` so verification can reject them
/// explicitly instead of failing on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    #[serde(other)]
    Other,
}

/// Claims of a short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (user identifier)
    pub sub: String,

    pub email: String,

    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    /// Create access claims issued at `now` and valid for `ttl`.
    pub fn new(
        user_id: impl ToString,
        email: impl ToString,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            token_type: TokenType::Access,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Seconds between issuance and expiry.
    pub fn lifetime_seconds(&self) -> i64 {
        self.exp - self.iat
    }

    /// Check if token is expired.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp <= current_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_claims() {
        let now = Utc::now();
        let claims = AccessClaims::new("user123", "a@x.com", now, Duration::minutes(15));

        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.lifetime_seconds(), 15 * 60);
    }

    #[test]
    fn test_type_tag_serialization() {
        let claims = AccessClaims::new("user123", "a@x.com", Utc::now(), Duration::minutes(1));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "access");
    }

    #[test]
    fn test_unknown_type_tag() {
        let json = serde_json::json!({
            "sub": "user123",
            "email": "a@x.com",
            "type": "refresh",
            "iat": 0,
            "exp": 10,
        });
        let claims: AccessClaims = serde_json::from_value(json).unwrap();
        assert_eq!(claims.token_type, TokenType::Other);
    }

    #[test]
    fn test_is_expired() {
        let claims = AccessClaims {
            sub: "user123".to_string(),
            email: "a@x.com".to_string(),
            token_type: TokenType::Access,
            iat: 0,
            exp: 1000,
        };

        assert!(!claims.is_expired(999));
        assert!(claims.is_expired(1000));
        assert!(claims.is_expired(1001));
    }
}

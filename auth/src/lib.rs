//! Authentication utilities library
//!
//! Provides reusable credential primitives for services:
//! - Password hashing (Argon2id) with a configurable work factor
//! - Password strength policy
//! - Short-lived access tokens (HS256 JWT with a type tag)
//! - Opaque refresh secrets, stored only as SHA-256 hashes
//!
//! Services define their own persistence and session rules and adapt these
//! implementations. Nothing in this crate performs I/O.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("Abc123!@").unwrap();
//! assert!(hasher.verify("Abc123!@", &hash).unwrap());
//! ```
//!
//! ## Access and Refresh Tokens
//! ```
//! use auth::Authenticator;
//!
//! let auth = Authenticator::new(b"secret_key_at_least_32_bytes_long!");
//!
//! let access = auth.issue_access_token("user123", "alice@example.com").unwrap();
//! let claims = auth.validate_access_token(&access.token).unwrap();
//! assert_eq!(claims.sub, "user123");
//!
//! let refresh = auth.generate_refresh_secret().unwrap();
//! let stored = refresh.hash();
//! assert_eq!(stored.len(), 64);
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod refresh;

pub use authenticator::AccessToken;
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use jwt::AccessClaims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::HashingCost;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::PasswordPolicy;
pub use password::PasswordPolicyError;
pub use password::PasswordRequirement;
pub use refresh::generate_opaque_token;
pub use refresh::RefreshSecret;
pub use refresh::SecretGenerationError;

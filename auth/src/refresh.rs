use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Error)]
pub enum SecretGenerationError {
    #[error("Failed to generate secret: {0}")]
    GenerationFailed(String),
}

/// 32 bytes of OS randomness, URL-safe base64 without padding (43 chars).
///
/// Used for refresh secrets and for single-use values such as OAuth state.
///
/// # Errors
/// * `GenerationFailed` - The OS random source is unavailable
pub fn generate_opaque_token() -> Result<String, SecretGenerationError> {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| SecretGenerationError::GenerationFailed(e.to_string()))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Opaque refresh-token secret.
///
/// The plaintext is handed to the client once; only [`RefreshSecret::hash`]
/// is ever persisted. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshSecret(String);

impl RefreshSecret {
    /// Generate a new secret from OS randomness.
    ///
    /// # Errors
    /// * `GenerationFailed` - The OS random source is unavailable
    pub fn generate() -> Result<Self, SecretGenerationError> {
        generate_opaque_token().map(Self)
    }

    /// Wrap a secret presented by a client.
    pub fn from_presented(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Deterministic storage hash: lowercase hex SHA-256.
    pub fn hash(&self) -> String {
        format!("{:x}", Sha256::digest(self.0.as_bytes()))
    }

    /// Plaintext value, for delivering to the client.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshSecret(<redacted>)")
    }
}

use super::errors::PasswordPolicyError;
use super::errors::PasswordRequirement;

const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Password strength policy enforced before hashing.
///
/// A password must have a minimum length and contain at least one
/// uppercase letter, one lowercase letter, one digit and one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    min_length: usize,
}

impl PasswordPolicy {
    pub const DEFAULT_MIN_LENGTH: usize = 8;

    pub fn new() -> Self {
        Self {
            min_length: Self::DEFAULT_MIN_LENGTH,
        }
    }

    /// Check a candidate password against the policy.
    ///
    /// # Errors
    /// * `PasswordPolicyError` - lists every requirement the password fails
    pub fn check(&self, password: &str) -> Result<(), PasswordPolicyError> {
        let mut unmet = Vec::new();

        if password.chars().count() < self.min_length {
            unmet.push(PasswordRequirement::MinLength(self.min_length));
        }
        if !password.chars().any(|c| c.is_uppercase()) {
            unmet.push(PasswordRequirement::Uppercase);
        }
        if !password.chars().any(|c| c.is_lowercase()) {
            unmet.push(PasswordRequirement::Lowercase);
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            unmet.push(PasswordRequirement::Digit);
        }
        if !password.chars().any(|c| SYMBOLS.contains(c)) {
            unmet.push(PasswordRequirement::Symbol);
        }

        if unmet.is_empty() {
            Ok(())
        } else {
            Err(PasswordPolicyError { unmet })
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new()
    }
}

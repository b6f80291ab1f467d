use std::fmt;

use thiserror::Error;

/// Error type for password hashing operations.
#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Password verification failed: {0}")]
    VerificationFailed(String),

    #[error("Invalid hashing cost: {0}")]
    InvalidCost(String),
}

/// A single requirement of the password strength policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRequirement {
    MinLength(usize),
    Uppercase,
    Lowercase,
    Digit,
    Symbol,
}

impl fmt::Display for PasswordRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordRequirement::MinLength(min) => write!(f, "at least {} characters", min),
            PasswordRequirement::Uppercase => f.write_str("an uppercase letter"),
            PasswordRequirement::Lowercase => f.write_str("a lowercase letter"),
            PasswordRequirement::Digit => f.write_str("a digit"),
            PasswordRequirement::Symbol => f.write_str("a special character"),
        }
    }
}

/// Password rejected by the strength policy.
///
/// Carries every unmet requirement so callers can render field-level guidance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Password must contain {}", render_requirements(.unmet))]
pub struct PasswordPolicyError {
    pub unmet: Vec<PasswordRequirement>,
}

fn render_requirements(unmet: &[PasswordRequirement]) -> String {
    unmet
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

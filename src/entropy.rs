//! Password strength gate
//!
//! Validates a password before it is used for key derivation. This runs
//! on the encrypt path only; decryption accepts whatever password the
//! vault was sealed with.
//!
//! The checks are heuristic: length, repetition, character-class
//! variety, a small embedded list of notoriously common passwords, and
//! a rough entropy estimate from length and implied alphabet size.

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};

/// Minimum acceptable password length in characters.
pub const MIN_LENGTH: usize = 8;

/// Minimum number of character classes (lower, upper, digit, other)
/// that must be present.
const MIN_CLASSES: usize = 3;

/// Minimum estimated entropy in bits.
const MIN_ENTROPY_BITS: f64 = 50.0;

/// Passwords rejected outright regardless of other properties.
const COMMON_PASSWORDS: &[&str] = &[
    "password", "passw0rd", "password1", "123456", "12345678", "123456789",
    "qwerty", "qwertyuiop", "letmein", "iloveyou", "welcome", "admin",
    "monkey", "dragon", "abc123", "sunshine", "princess", "trustno1",
];

/// Validate password strength.
///
/// Returns `Ok(())` for acceptable passwords. All rejections carry
/// `ErrorKind::WeakPassword` with a message naming the specific reason,
/// so a caller can re-prompt with useful feedback.
pub fn validate(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(weak("password is empty"));
    }

    let length = password.chars().count();
    if length < MIN_LENGTH {
        return Err(weak(format!(
            "password must be at least {} characters (got {})",
            MIN_LENGTH, length
        )));
    }

    if is_repetitive(password) {
        return Err(weak(
            "password is too repetitive; avoid repeated characters or patterns",
        ));
    }

    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        return Err(weak("password is too close to a commonly used password"));
    }

    let classes = character_classes(password);
    if classes < MIN_CLASSES {
        return Err(weak(format!(
            "password needs more character variety; use at least {} of: \
             lowercase, uppercase, digits, symbols",
            MIN_CLASSES
        )));
    }

    if estimated_bits(password) < MIN_ENTROPY_BITS {
        return Err(weak("estimated password entropy is too low"));
    }

    Ok(())
}

fn weak(msg: impl Into<String>) -> VaultError {
    VaultError::with_kind(ErrorCategory::User, ErrorKind::WeakPassword, msg)
}

/// Count which of the four character classes appear in the password.
fn character_classes(password: &str) -> usize {
    let mut lower = false;
    let mut upper = false;
    let mut digit = false;
    let mut other = false;
    for c in password.chars() {
        if c.is_lowercase() {
            lower = true;
        } else if c.is_uppercase() {
            upper = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else {
            other = true;
        }
    }
    [lower, upper, digit, other].iter().filter(|b| **b).count()
}

/// Detect passwords dominated by repetition: very few distinct
/// characters, or the whole string being one short block repeated.
fn is_repetitive(password: &str) -> bool {
    let chars: Vec<char> = password.chars().collect();
    let mut distinct: Vec<char> = chars.clone();
    distinct.sort_unstable();
    distinct.dedup();

    // "aaaaaaaa", "abababab": distinct alphabet carries no real content.
    if distinct.len() * 3 < chars.len() {
        return true;
    }

    // Whole string is a short block repeated, e.g. "Xy1!Xy1!".
    for block_len in 1..=chars.len() / 2 {
        if chars.len() % block_len != 0 {
            continue;
        }
        if chars.chunks(block_len).all(|chunk| chunk == &chars[..block_len]) {
            return true;
        }
    }

    false
}

/// Rough entropy estimate: length times log2 of the alphabet implied by
/// the character classes in use.
fn estimated_bits(password: &str) -> f64 {
    let mut space = 0usize;
    if password.chars().any(|c| c.is_lowercase()) {
        space += 26;
    }
    if password.chars().any(|c| c.is_uppercase()) {
        space += 26;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        space += 10;
    }
    if password
        .chars()
        .any(|c| !c.is_lowercase() && !c.is_uppercase() && !c.is_ascii_digit())
    {
        space += 33;
    }
    password.chars().count() as f64 * (space as f64).log2()
}

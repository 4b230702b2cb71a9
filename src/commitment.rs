//! Password commitment
//!
//! A one-way digest of the password that the host persists so a wrong
//! password can be rejected on the decrypt path before any file is
//! touched. The commitment is the only on-disk trace of the password.
//!
//! Deliberately independent of the key derivation in `kdf`: SHA-256
//! over `password || PEPPER` here, scrypt over `password || SALT`
//! there. Leaking the stored commitment therefore does not yield the
//! encryption key, and an attacker who wants to brute-force the fast
//! commitment hash still has to pay scrypt to get a usable key.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Fixed build-embedded pepper mixed into the commitment digest.
const PEPPER: &[u8; 16] = b"vaultlock.pcv.v1";

/// Compute the commitment for a password.
///
/// Returns the hex-encoded SHA-256 of `password || PEPPER`. The same
/// password always produces the same commitment.
pub fn commit(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(PEPPER);
    hex::encode(hasher.finalize())
}

/// Check a password against a stored commitment.
///
/// Recomputes the commitment and compares digests in constant time. A
/// stored value that does not decode as a 32-byte hex digest compares
/// unequal.
pub fn verify(password: &str, stored: &str) -> bool {
    let expected = match hex::decode(stored) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(PEPPER);
    let actual = hasher.finalize();

    actual.as_slice().ct_eq(&expected).into()
}

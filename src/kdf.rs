//! Key derivation from the user's password
//!
//! scrypt turns the password into the 32-byte symmetric key used for
//! file encryption. The salt is a fixed application constant: every
//! vault sealed by this build derives from the same salt. This is a
//! deliberate simplicity trade-off inherited from the format (a single
//! password, no per-vault key material on disk) and is a documented
//! weakness: it allows precomputation across vaults. The scrypt cost
//! parameters keep brute-force expensive regardless.
//!
//! The derived key is independent of the password commitment (see
//! `commitment`): different function family, different embedded
//! constant, so a leaked commitment does not assist key recovery.

use scrypt::{Params, scrypt};
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};

/// Length of the derived key in bytes.
pub const KEY_LEN: usize = 32;

/// Fixed application-wide scrypt salt. Identical across all vaults
/// using this build; see module docs.
const SALT: &[u8; 16] = b"vaultlock.kdf.v1";

/// scrypt N parameter (CPU/memory cost)
const SCRYPT_N: u32 = 32768;

/// scrypt r parameter (block size)
const SCRYPT_R: u32 = 8;

/// scrypt p parameter (parallelization)
const SCRYPT_P: u32 = 1;

/// The symmetric key derived from the user's password.
///
/// Owned by the caller for the duration of one batch operation and
/// wiped from memory on drop. Never logged, never persisted.
pub struct DerivedKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Construct a key from raw bytes. Intended for tests that need a
    /// key without paying the scrypt cost.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("DerivedKey(..)")
    }
}

/// Derive the working key from a password.
///
/// Deterministic: the same password always yields the same key, which
/// is what lets decryption reproduce the key used at encryption time.
pub fn derive_key(password: &str) -> Result<DerivedKey> {
    let params = Params::new(
        (SCRYPT_N as f64).log2() as u8, // log_n
        SCRYPT_R,
        SCRYPT_P,
        KEY_LEN,
    )
    .map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::ScryptFailure,
            "failed to create scrypt params",
            e,
        )
    })?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt(password.as_bytes(), SALT, &params, &mut *key).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::ScryptFailure,
            "scrypt key derivation failed",
            e,
        )
    })?;

    Ok(DerivedKey { bytes: key })
}

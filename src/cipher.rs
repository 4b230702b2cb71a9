//! Sealed-file format and authenticated encryption
//!
//! One authenticated-encryption scheme, applied uniformly: NaCl
//! secretbox (XSalsa20Poly1305) with a fresh random nonce per file per
//! encryption. The key comes from `kdf`; this module never derives it.
//!
//! The on-disk format, fixed and versioned by the magic bytes:
//! - magic: 8 bytes ("VLTLOCK1")
//! - nonce: 24 bytes
//! - Poly1305 tag: 16 bytes
//! - ciphertext: remaining bytes (same length as the plaintext)

use crypto_secretbox::aead::{AeadInPlace, KeyInit};
use crypto_secretbox::{Nonce, Tag, XSalsa20Poly1305};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::kdf::DerivedKey;

/// Format tag identifying vaultlock ciphertext, version 1.
pub const MAGIC: &[u8; MAGIC_LEN] = b"VLTLOCK1";

/// Length of the magic in bytes
pub const MAGIC_LEN: usize = 8;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of the authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Total header length preceding the ciphertext.
pub const HEADER_LEN: usize = MAGIC_LEN + NONCE_LEN + TAG_LEN;

/// Whether `data` plausibly holds sealed vaultlock content: the magic
/// is present and the length covers a complete header.
///
/// This is the double-transform guard. It is heuristic by necessity: a
/// plaintext that genuinely starts with the magic bytes and is at least
/// `HEADER_LEN` long is indistinguishable from ciphertext without the
/// key, and sealing it is refused rather than risking a later decrypt
/// destroying it.
pub fn looks_sealed(data: &[u8]) -> bool {
    data.len() >= HEADER_LEN && data.starts_with(MAGIC)
}

/// Seal plaintext under a derived key with a fresh random nonce.
///
/// Returns the full file format: magic + nonce + tag + ciphertext.
pub fn seal(key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    seal_with_nonce(key, plaintext, &nonce)
}

/// Seal plaintext with a caller-provided nonce.
///
/// This function is ONLY for testing purposes to generate deterministic
/// output. NEVER use this in production - always use `seal()`, which
/// generates a random nonce.
pub fn seal_with_nonce(
    key: &DerivedKey,
    plaintext: &[u8],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let cipher = XSalsa20Poly1305::new(key.as_bytes().into());
    let nonce_obj = Nonce::from(*nonce);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(&nonce_obj, b"", &mut buffer)
        .map_err(|e| {
            VaultError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::SecretboxFailure,
                format!("secretbox seal failed: {}", e),
            )
        })?;

    let mut output = Vec::with_capacity(HEADER_LEN + buffer.len());
    output.extend_from_slice(MAGIC);
    output.extend_from_slice(nonce);
    output.extend_from_slice(&tag);
    output.extend_from_slice(&buffer);

    Ok(output)
}

/// Open sealed data, returning the recovered plaintext.
///
/// Distinguishes three failure modes: data without the magic is
/// `FormatMismatch` (not vaultlock ciphertext, or an attempt to decrypt
/// plaintext), data with the magic but an incomplete header is
/// `TruncatedInput`, and a tag verification failure is
/// `CiphertextCorrupt` (wrong key, tampering, or corruption).
pub fn open(key: &DerivedKey, data: &[u8]) -> Result<Vec<u8>> {
    if !data.starts_with(MAGIC) {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::FormatMismatch,
            "input does not carry the vaultlock format tag; refusing to decrypt plaintext",
        ));
    }

    if data.len() < HEADER_LEN {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::TruncatedInput,
            "input likely truncated while reading nonce and tag",
        ));
    }

    let mut pos = MAGIC_LEN;
    let nonce: [u8; NONCE_LEN] = data[pos..pos + NONCE_LEN].try_into().map_err(|_| {
        VaultError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to read nonce",
        )
    })?;
    pos += NONCE_LEN;

    let tag = Tag::clone_from_slice(&data[pos..pos + TAG_LEN]);
    pos += TAG_LEN;

    let cipher = XSalsa20Poly1305::new(key.as_bytes().into());
    let nonce_obj = Nonce::from(nonce);

    let mut buffer = data[pos..].to_vec();
    cipher
        .decrypt_in_place_detached(&nonce_obj, b"", &mut buffer, &tag)
        .map_err(|_| {
            VaultError::with_kind(
                ErrorCategory::User,
                ErrorKind::CiphertextCorrupt,
                "authentication failed: wrong password, tampered-with data, or corruption",
            )
        })?;

    Ok(buffer)
}

//! Per-file encrypt/decrypt with in-place atomic rewrite
//!
//! `transform` is the engine the batch processor drives: it reads a
//! file's bytes, seals or opens them, and rewrites the file in place.
//! The rewrite is atomic from the filesystem observer's perspective:
//! content goes to a tempfile in the same directory, is flushed and
//! fsynced, and is then renamed over the original. A crash at any point
//! before the rename leaves the original bytes intact; the path is
//! never truncated and rewritten directly.
//!
//! The engine carries its own double-transform guard: encrypting a file
//! that already looks sealed, or decrypting one that does not, fails
//! fast with `FormatMismatch` regardless of what the caller's state
//! tracking claims.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::cipher;
use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::kdf::DerivedKey;

/// The direction of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Encrypt => f.write_str("encrypt"),
            Operation::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// Encrypt or decrypt a single file in place.
///
/// On any failure the file on disk is left exactly as it was.
pub fn transform(path: &Path, key: &DerivedKey, operation: Operation) -> Result<()> {
    let current = fs::read(path).map_err(|e| read_error(path, e))?;

    let new_contents = match operation {
        Operation::Encrypt => {
            if cipher::looks_sealed(&current) {
                return Err(VaultError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::FormatMismatch,
                    format!(
                        "{} already looks encrypted; refusing to encrypt twice",
                        path.display()
                    ),
                ));
            }
            cipher::seal(key, &current)
                .map_err(|e| e.with_context(format!("failed to encrypt {}", path.display())))?
        }
        Operation::Decrypt => cipher::open(key, &current)
            .map_err(|e| e.with_context(format!("failed to decrypt {}", path.display())))?,
    };

    atomic_rewrite(path, &new_contents)
        .map_err(|e| e.with_context(format!("failed to rewrite {}", path.display())))
}

/// Replace `path`'s contents atomically: tempfile in the same
/// directory, write, flush, fsync, rename. Existing Unix permissions
/// are carried over to the new file.
pub fn atomic_rewrite(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("{} has no parent directory", path.display()),
        )
    })?;

    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to create tempfile",
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    // Keep the original file's permissions on the replacement.
    #[cfg(unix)]
    {
        if let Ok(metadata) = fs::metadata(path) {
            temp_file
                .as_file()
                .set_permissions(metadata.permissions())
                .map_err(|e| {
                    VaultError::with_kind_and_source(
                        ErrorCategory::Internal,
                        ErrorKind::Io,
                        "failed to set tempfile permissions",
                        e,
                    )
                })?;
        }
    }

    temp_file.persist(path).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> VaultError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    VaultError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

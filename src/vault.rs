//! Vault file enumeration
//!
//! Walks the vault root and yields every regular file eligible for
//! transformation, in a stable order: depth-first, lexicographic by
//! file name within each directory. Repeated runs over an unchanged
//! tree enumerate the same sequence, which keeps "processed N of M"
//! diagnostics reproducible.
//!
//! Symbolic links are never followed (a link pointing outside the vault
//! must not pull foreign files into the operation) and link entries
//! themselves are skipped. The settings record written by the host
//! (`settings::SETTINGS_FILE_NAME`) is excluded wherever it appears.
//!
//! An entry the walk cannot read does not abort enumeration: it is
//! collected with its error so the rest of the vault stays reachable
//! and the caller can surface the denied paths. Only a failure on the
//! root itself is fatal - there is no vault to walk.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::settings::SETTINGS_FILE_NAME;

/// Outcome of one enumeration pass.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// Files eligible for transformation, in enumeration order.
    pub files: Vec<PathBuf>,
    /// Entries the walk could not read, with the per-entry error.
    pub denied: Vec<(PathBuf, VaultError)>,
}

/// Enumerate the files under `root` eligible for encryption/decryption.
///
/// The walk is fresh on every call; the tree may have changed between
/// operations and nothing is cached. Returns `Err` only when the root
/// itself cannot be walked.
pub fn enumerate(root: &Path) -> Result<Enumeration> {
    let mut result = Enumeration::default();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf);
                let wrapped = VaultError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    match &path {
                        Some(p) => format!("failed to walk {}", p.display()),
                        None => format!("failed to walk vault at {}", root.display()),
                    },
                    err,
                );
                match path {
                    Some(p) if p != root => {
                        result.denied.push((p, wrapped));
                        continue;
                    }
                    _ => return Err(wrapped),
                }
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name() == SETTINGS_FILE_NAME {
            continue;
        }

        result.files.push(entry.into_path());
    }

    Ok(result)
}

//! Host-owned persisted state
//!
//! The JSON record stored next to the vault: whether the vault is
//! currently encrypted, and the password commitment taken at encrypt
//! time. This is caller state; the core library never reads the
//! `encryption` flag to make decisions (the engine's format guard
//! covers the case where the flag is stale or wrong). The commitment
//! is the only on-disk trace of the password.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::file_ops;

/// File name of the settings record, stored at the vault root. The
/// enumerator excludes it from transformation.
pub const SETTINGS_FILE_NAME: &str = "vaultlock.json";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaultSettings {
    /// Whether the vault's files are currently ciphertext.
    #[serde(default)]
    pub encryption: bool,
    /// Commitment of the password the vault was sealed with, if any.
    #[serde(default)]
    pub password_commitment: Option<String>,
}

/// Path of the settings record for a vault root.
pub fn settings_path(vault_root: &Path) -> PathBuf {
    vault_root.join(SETTINGS_FILE_NAME)
}

/// Load the settings record, defaulting when none exists yet.
pub fn load(vault_root: &Path) -> Result<VaultSettings> {
    let path = settings_path(vault_root);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(VaultSettings::default()),
        Err(e) => {
            return Err(VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to read {}", path.display()),
                e,
            ));
        }
    };

    serde_json::from_str(&contents).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::SettingsInvalid,
            format!("failed to parse {}", path.display()),
            e,
        )
    })
}

/// Persist the settings record atomically.
pub fn store(vault_root: &Path, settings: &VaultSettings) -> Result<()> {
    let path = settings_path(vault_root);
    let contents = serde_json::to_vec_pretty(settings).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to serialize settings",
            e,
        )
    })?;

    file_ops::atomic_rewrite(&path, &contents)
        .map_err(|e| e.with_context(format!("failed to write {}", path.display())))
}

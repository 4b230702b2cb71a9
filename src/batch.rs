//! Whole-vault batch processing
//!
//! Drives the per-file engine across every eligible file for one
//! operation. One file failing does not abort the batch; every failure
//! is collected so the caller can report exactly which files are left
//! in the other state. Per-file transforms are independent (the derived
//! key is shared immutably) and run on the rayon worker pool.
//!
//! A non-empty `failed` list means the vault is now mixed-state.
//! Re-running the whole batch blindly is the wrong remediation - the
//! engine's format guard would refuse the already-transformed files -
//! so `retry_file` exists as the per-file entry point.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::error::{Result, VaultError};
use crate::file_ops::{self, Operation};
use crate::kdf::DerivedKey;
use crate::vault;

/// Outcome of one batch operation. Every enumerated file appears in
/// exactly one of the three lists, in enumeration order.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Files transformed successfully.
    pub succeeded: Vec<PathBuf>,
    /// Files that failed, with the per-file error. Also carries entries
    /// the enumerator could not read, so denied paths are surfaced
    /// instead of silently narrowing the batch.
    pub failed: Vec<(PathBuf, VaultError)>,
    /// Files never started because cancellation was requested. Always
    /// empty unless a cancel flag was passed and tripped.
    pub skipped: Vec<PathBuf>,
}

impl BatchResult {
    /// True when every enumerated file was transformed.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Total number of files the batch enumerated.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }
}

/// Run one operation over every eligible file under `vault_root`.
///
/// Returns `Err` only if enumeration itself fails; per-file failures
/// are collected in the result.
pub fn run(vault_root: &Path, key: &DerivedKey, operation: Operation) -> Result<BatchResult> {
    let never_cancelled = AtomicBool::new(false);
    run_with_cancel(vault_root, key, operation, &never_cancelled)
}

/// Like [`run`], with cooperative cancellation.
///
/// The flag is checked before each file starts; once set, no new
/// transforms begin, but in-flight ones always finish so the atomic
/// rewrite guarantee is never broken mid-write. Files that never
/// started are reported in `skipped`.
pub fn run_with_cancel(
    vault_root: &Path,
    key: &DerivedKey,
    operation: Operation,
    cancel: &AtomicBool,
) -> Result<BatchResult> {
    let enumeration = vault::enumerate(vault_root)?;

    let outcomes: Vec<(PathBuf, Option<Result<()>>)> = enumeration
        .files
        .into_par_iter()
        .map(|path| {
            if cancel.load(Ordering::SeqCst) {
                return (path, None);
            }
            let outcome = file_ops::transform(&path, key, operation);
            (path, Some(outcome))
        })
        .collect();

    let mut result = BatchResult {
        failed: enumeration.denied,
        ..BatchResult::default()
    };
    for (path, outcome) in outcomes {
        match outcome {
            Some(Ok(())) => result.succeeded.push(path),
            Some(Err(err)) => result.failed.push((path, err)),
            None => result.skipped.push(path),
        }
    }

    Ok(result)
}

/// Transform a single file: the remediation entry point for a
/// mixed-state vault after a partial batch failure.
///
/// Carries the same format guards as the batch, so retrying a file that
/// was in fact already transformed fails cleanly instead of
/// double-transforming it.
pub fn retry_file(path: &Path, key: &DerivedKey, operation: Operation) -> Result<()> {
    file_ops::transform(path, key, operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn test_key(byte: u8) -> DerivedKey {
        DerivedKey::from_bytes([byte; 32])
    }

    fn make_vault(files: &[(&str, &[u8])]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for (name, contents) in files {
            let path = temp_dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_encrypt_decrypt_whole_vault() {
        let vault = make_vault(&[
            ("a.md", b"alpha"),
            ("b.md", b""),
            ("notes/c.md", b"gamma"),
        ]);
        let key = test_key(1);

        let result = run(vault.path(), &key, Operation::Encrypt).unwrap();
        assert!(result.is_complete_success());
        assert_eq!(result.succeeded.len(), 3);
        for path in &result.succeeded {
            assert!(cipher::looks_sealed(&fs::read(path).unwrap()));
        }

        let result = run(vault.path(), &key, Operation::Decrypt).unwrap();
        assert!(result.is_complete_success());
        assert_eq!(fs::read(vault.path().join("a.md")).unwrap(), b"alpha");
        assert_eq!(fs::read(vault.path().join("b.md")).unwrap(), b"");
        assert_eq!(fs::read(vault.path().join("notes/c.md")).unwrap(), b"gamma");
    }

    #[test]
    fn test_results_follow_enumeration_order() {
        let vault = make_vault(&[("c.md", b"3"), ("a.md", b"1"), ("b.md", b"2")]);
        let key = test_key(1);

        let result = run(vault.path(), &key, Operation::Encrypt).unwrap();
        assert_eq!(
            result.succeeded,
            vec![
                vault.path().join("a.md"),
                vault.path().join("b.md"),
                vault.path().join("c.md"),
            ]
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_partial_failure_is_isolated() {
        use std::os::unix::fs::PermissionsExt;

        let vault = make_vault(&[("a.md", b"a"), ("b.md", b"b"), ("c.md", b"c")]);
        let unreadable = vault.path().join("b.md");
        fs::set_permissions(&unreadable, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&unreadable).is_ok() {
            // Running privileged; the permission bits are not enforced
            // and this scenario cannot be staged.
            return;
        }

        let key = test_key(1);
        let result = run(vault.path(), &key, Operation::Encrypt).unwrap();

        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0, unreadable);
        assert_eq!(result.failed[0].1.kind, Some(ErrorKind::Io));
        assert_eq!(result.total(), 3);

        // The other files were still transformed.
        assert!(cipher::looks_sealed(&fs::read(vault.path().join("a.md")).unwrap()));
        assert!(cipher::looks_sealed(&fs::read(vault.path().join("c.md")).unwrap()));
    }

    #[test]
    #[cfg(unix)]
    fn test_unreadable_subdirectory_does_not_stop_the_batch() {
        use std::os::unix::fs::PermissionsExt;

        let vault = make_vault(&[("a.md", b"a"), ("z.md", b"z")]);
        let locked = vault.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Running privileged; the permission bits are not enforced
            // and this scenario cannot be staged.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();
            return;
        }

        let key = test_key(1);
        let result = run(vault.path(), &key, Operation::Encrypt).unwrap();

        // The rest of the vault was still sealed; the denied directory
        // is surfaced as a failure rather than dropped.
        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0, locked);
        assert_eq!(result.failed[0].1.kind, Some(ErrorKind::Io));
        assert!(cipher::looks_sealed(&fs::read(vault.path().join("a.md")).unwrap()));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();
    }

    #[test]
    fn test_format_failure_is_isolated() {
        // One file is already sealed; encrypting the vault fails for it
        // alone while the rest proceed.
        let key = test_key(1);
        let pre_sealed = cipher::seal(&key, b"was already sealed").unwrap();
        let vault = make_vault(&[("a.md", b"a"), ("z.md", b"z")]);
        fs::write(vault.path().join("m.md"), &pre_sealed).unwrap();

        let result = run(vault.path(), &key, Operation::Encrypt).unwrap();
        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0, vault.path().join("m.md"));
        assert_eq!(result.failed[0].1.kind, Some(ErrorKind::FormatMismatch));
        assert_eq!(fs::read(vault.path().join("m.md")).unwrap(), pre_sealed);
    }

    #[test]
    fn test_reencrypting_encrypted_vault_does_not_double_encrypt() {
        let vault = make_vault(&[("a.md", b"alpha"), ("b.md", b"beta")]);
        let key = test_key(1);

        run(vault.path(), &key, Operation::Encrypt).unwrap();
        let sealed_a = fs::read(vault.path().join("a.md")).unwrap();
        let sealed_b = fs::read(vault.path().join("b.md")).unwrap();

        let result = run(vault.path(), &key, Operation::Encrypt).unwrap();
        assert!(result.succeeded.is_empty());
        assert_eq!(result.failed.len(), 2);
        for (_, err) in &result.failed {
            assert_eq!(err.kind, Some(ErrorKind::FormatMismatch));
        }

        // Bytes unchanged; the original plaintext is one decrypt away.
        assert_eq!(fs::read(vault.path().join("a.md")).unwrap(), sealed_a);
        assert_eq!(fs::read(vault.path().join("b.md")).unwrap(), sealed_b);
    }

    #[test]
    fn test_pre_tripped_cancel_skips_everything() {
        let vault = make_vault(&[("a.md", b"a"), ("b.md", b"b")]);
        let key = test_key(1);
        let cancel = AtomicBool::new(true);

        let result = run_with_cancel(vault.path(), &key, Operation::Encrypt, &cancel).unwrap();
        assert!(result.succeeded.is_empty());
        assert!(result.failed.is_empty());
        assert_eq!(result.skipped.len(), 2);

        // Nothing was touched.
        assert_eq!(fs::read(vault.path().join("a.md")).unwrap(), b"a");
        assert_eq!(fs::read(vault.path().join("b.md")).unwrap(), b"b");
    }

    #[test]
    fn test_retry_file_completes_a_mixed_vault() {
        let vault = make_vault(&[("a.md", b"a"), ("b.md", b"b")]);
        let key = test_key(1);

        run(vault.path(), &key, Operation::Encrypt).unwrap();

        // Put one file back to plaintext to fabricate a mixed state.
        let stray = vault.path().join("b.md");
        crate::file_ops::transform(&stray, &key, Operation::Decrypt).unwrap();

        retry_file(&stray, &key, Operation::Encrypt).unwrap();
        assert!(cipher::looks_sealed(&fs::read(&stray).unwrap()));

        // The already-sealed neighbor would be refused, not mangled.
        let err = retry_file(&vault.path().join("a.md"), &key, Operation::Encrypt)
            .expect_err("expected refusal");
        assert_eq!(err.kind, Some(ErrorKind::FormatMismatch));
    }

    #[test]
    fn test_empty_vault() {
        let vault = TempDir::new().unwrap();
        let result = run(vault.path(), &test_key(1), Operation::Encrypt).unwrap();
        assert!(result.is_complete_success());
        assert_eq!(result.total(), 0);
    }
}

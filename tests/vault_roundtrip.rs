//! Library-level end-to-end tests
//!
//! Exercises the full flow a host drives: entropy gate, key
//! derivation, commitment, batch encrypt, commitment verification,
//! batch decrypt.

use std::fs;

use tempfile::TempDir;

use vaultlock::batch;
use vaultlock::error::ErrorKind;
use vaultlock::file_ops::Operation;
use vaultlock::{cipher, commitment, entropy, kdf, settings, vault};

const PASSWORD: &str = "Tr0ub4dor&3";

fn make_vault() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.md"), "hello").unwrap();
    fs::write(temp_dir.path().join("b.md"), "").unwrap();
    temp_dir
}

#[test]
fn test_full_encrypt_decrypt_flow() {
    let vault_dir = make_vault();
    let root = vault_dir.path();

    // Encrypt path: gate, derive, seal, persist commitment.
    entropy::validate(PASSWORD).unwrap();
    let key = kdf::derive_key(PASSWORD).unwrap();
    let result = batch::run(root, &key, Operation::Encrypt).unwrap();
    assert!(result.is_complete_success());
    assert_eq!(result.succeeded.len(), 2);
    drop(key);

    let stored = settings::VaultSettings {
        encryption: true,
        password_commitment: Some(commitment::commit(PASSWORD)),
    };
    settings::store(root, &stored).unwrap();

    // Both files are now valid ciphertext and differ from the originals.
    for name in ["a.md", "b.md"] {
        let bytes = fs::read(root.join(name)).unwrap();
        assert!(cipher::looks_sealed(&bytes));
        assert!(bytes.len() >= cipher::HEADER_LEN);
    }
    assert_ne!(fs::read(root.join("a.md")).unwrap(), b"hello");

    // Decrypt path: wrong password is rejected by the commitment before
    // any file is touched.
    let reloaded = settings::load(root).unwrap();
    let stored_commitment = reloaded.password_commitment.as_deref().unwrap();
    assert!(!commitment::verify("wrong password", stored_commitment));
    assert!(commitment::verify(PASSWORD, stored_commitment));

    let key = kdf::derive_key(PASSWORD).unwrap();
    let result = batch::run(root, &key, Operation::Decrypt).unwrap();
    assert!(result.is_complete_success());

    assert_eq!(fs::read(root.join("a.md")).unwrap(), b"hello");
    assert_eq!(fs::read(root.join("b.md")).unwrap(), b"");
}

#[test]
fn test_settings_file_survives_encryption_untouched() {
    let vault_dir = make_vault();
    let root = vault_dir.path();

    let stored = settings::VaultSettings::default();
    settings::store(root, &stored).unwrap();

    let key = kdf::derive_key(PASSWORD).unwrap();
    batch::run(root, &key, Operation::Encrypt).unwrap();

    // The record is still parseable JSON, not ciphertext.
    assert_eq!(settings::load(root).unwrap(), stored);

    // And the enumerator never offered it up.
    let files = vault::enumerate(root).unwrap().files;
    assert!(files.iter().all(|p| p.file_name().unwrap() != settings::SETTINGS_FILE_NAME));
}

#[test]
fn test_decrypt_with_wrong_key_fails_per_file_without_damage() {
    let vault_dir = make_vault();
    let root = vault_dir.path();

    let key = kdf::derive_key(PASSWORD).unwrap();
    batch::run(root, &key, Operation::Encrypt).unwrap();
    let sealed_a = fs::read(root.join("a.md")).unwrap();

    // A caller that skips the commitment check still cannot corrupt the
    // vault: every file fails tag verification and keeps its bytes.
    let wrong_key = kdf::derive_key("wrong password").unwrap();
    let result = batch::run(root, &wrong_key, Operation::Decrypt).unwrap();
    assert!(result.succeeded.is_empty());
    assert_eq!(result.failed.len(), 2);
    for (_, err) in &result.failed {
        assert_eq!(err.kind, Some(ErrorKind::CiphertextCorrupt));
    }
    assert_eq!(fs::read(root.join("a.md")).unwrap(), sealed_a);

    // The right key still works afterwards.
    let result = batch::run(root, &key, Operation::Decrypt).unwrap();
    assert!(result.is_complete_success());
    assert_eq!(fs::read(root.join("a.md")).unwrap(), b"hello");
}

#[test]
fn test_key_derivation_reproduces_across_sessions() {
    // Decryption in a later session depends on deriving the exact key
    // used at encryption time.
    let k1 = kdf::derive_key(PASSWORD).unwrap();
    let k2 = kdf::derive_key(PASSWORD).unwrap();
    assert_eq!(k1.as_bytes(), k2.as_bytes());

    let sealed = cipher::seal(&k1, b"cross-session payload").unwrap();
    assert_eq!(cipher::open(&k2, &sealed).unwrap(), b"cross-session payload");
}

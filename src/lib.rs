//! vaultlock - password-based, at-rest encryption for a whole document tree
//!
//! Given a password, every eligible file under a vault root is sealed
//! in place with NaCl secretbox under a scrypt-derived key; the same
//! password reverses the transform. A stored commitment lets a wrong
//! password be rejected before any file is touched, and each file is
//! rewritten atomically so a crash never leaves partial content.

#![forbid(unsafe_code)]

pub mod batch;
pub mod cipher;
pub mod commitment;
pub mod entropy;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;
pub mod settings;
pub mod vault;

//! vaultlock CLI - password-based whole-vault encryption
//!
//! The host layer: prompts for the password, keeps the settings record
//! next to the vault, and drives the library's batch operations. All
//! password and state checks the original host performed live here;
//! the library stays UI-free and stateless between calls.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use zeroize::Zeroizing;

use vaultlock::batch::{self, BatchResult};
use vaultlock::error::{ErrorCategory, ErrorKind, Result, VaultError};
use vaultlock::file_ops::Operation;
use vaultlock::passphrase::{PasswordReader, StdinPasswordReader, TerminalPasswordReader};
use vaultlock::{cipher, commitment, entropy, kdf, settings, vault};

#[derive(Parser)]
#[command(name = "vaultlock")]
#[command(version)]
#[command(about = "Password-based encryption for a whole vault of files.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt every file in the vault
    #[command(alias = "e")]
    Encrypt {
        /// Path to the vault root directory
        #[arg(short, long, value_name = "DIR")]
        vault: PathBuf,
    },

    /// Decrypt every file in the vault
    #[command(alias = "d")]
    Decrypt {
        /// Path to the vault root directory
        #[arg(short, long, value_name = "DIR")]
        vault: PathBuf,
    },

    /// Retry a single file after a partial batch failure
    Retry {
        /// Path to the vault root directory
        #[arg(short, long, value_name = "DIR")]
        vault: PathBuf,

        /// Path to the file to retry
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        /// Direction to apply
        #[arg(value_enum)]
        operation: OperationArg,
    },

    /// Show the vault's recorded and observed encryption state
    Status {
        /// Path to the vault root directory
        #[arg(short, long, value_name = "DIR")]
        vault: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OperationArg {
    Encrypt,
    Decrypt,
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Encrypt => Operation::Encrypt,
            OperationArg::Decrypt => Operation::Decrypt,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let use_stdin = cli.passphrase_stdin;

    let outcome = match cli.command {
        Commands::Encrypt { vault } => cmd_encrypt(&vault, use_stdin),
        Commands::Decrypt { vault } => cmd_decrypt(&vault, use_stdin),
        Commands::Retry {
            vault,
            file,
            operation,
        } => cmd_retry(&vault, &file, operation.into(), use_stdin),
        Commands::Status { vault } => cmd_status(&vault),
    };

    match outcome {
        Ok(clean) => {
            if !clean {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            let mut source: Option<&dyn std::error::Error> =
                e.source_error().map(|s| s as &dyn std::error::Error);
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            process::exit(1);
        }
    }
}

/// Encrypt the whole vault. Returns Ok(false) when some files failed.
fn cmd_encrypt(vault_root: &PathBuf, use_stdin: bool) -> Result<bool> {
    let mut stored = settings::load(vault_root)?;
    if stored.encryption {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::FormatMismatch,
            "vault is already recorded as encrypted; decrypt it first",
        ));
    }

    let password = read_new_password(use_stdin)?;
    entropy::validate(&password)?;
    let key = kdf::derive_key(&password)?;

    let result = batch::run(vault_root, &key, Operation::Encrypt)?;
    report(&result, Operation::Encrypt);

    // Persist the commitment even on a partial failure: the files that
    // did seal can only ever be recovered with this password.
    if !result.succeeded.is_empty() || result.is_complete_success() {
        stored.encryption = true;
        stored.password_commitment = Some(commitment::commit(&password));
        settings::store(vault_root, &stored)?;
    }

    Ok(result.is_complete_success())
}

/// Decrypt the whole vault. Returns Ok(false) when some files failed.
fn cmd_decrypt(vault_root: &PathBuf, use_stdin: bool) -> Result<bool> {
    let mut stored = settings::load(vault_root)?;
    let password = read_password(use_stdin, "Password (vaultlock): ")?;

    // Commitment check runs before any file is touched: a wrong
    // password aborts here with zero mutation.
    if let Some(stored_commitment) = &stored.password_commitment {
        if !commitment::verify(&password, stored_commitment) {
            return Err(VaultError::with_kind(
                ErrorCategory::User,
                ErrorKind::PasswordIncorrect,
                "password incorrect; no files were modified",
            ));
        }
    }

    let key = kdf::derive_key(&password)?;
    let result = batch::run(vault_root, &key, Operation::Decrypt)?;
    report(&result, Operation::Decrypt);

    if result.is_complete_success() {
        stored.encryption = false;
        stored.password_commitment = None;
        settings::store(vault_root, &stored)?;
    }

    Ok(result.is_complete_success())
}

fn cmd_retry(
    vault_root: &PathBuf,
    file: &PathBuf,
    operation: Operation,
    use_stdin: bool,
) -> Result<bool> {
    let stored = settings::load(vault_root)?;
    let password = read_password(use_stdin, "Password (vaultlock): ")?;

    if operation == Operation::Decrypt {
        if let Some(stored_commitment) = &stored.password_commitment {
            if !commitment::verify(&password, stored_commitment) {
                return Err(VaultError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::PasswordIncorrect,
                    "password incorrect; no files were modified",
                ));
            }
        }
    }

    let key = kdf::derive_key(&password)?;
    batch::retry_file(file, &key, operation)?;
    println!("{}: {} ok", operation, file.display());
    Ok(true)
}

fn cmd_status(vault_root: &PathBuf) -> Result<bool> {
    let stored = settings::load(vault_root)?;
    let enumeration = vault::enumerate(vault_root)?;
    let files = &enumeration.files;

    let mut sealed = 0usize;
    let mut plain = 0usize;
    let mut unreadable = enumeration.denied.len();
    for path in files {
        match std::fs::read(path) {
            Ok(bytes) if cipher::looks_sealed(&bytes) => sealed += 1,
            Ok(_) => plain += 1,
            Err(_) => unreadable += 1,
        }
    }

    println!(
        "recorded state: {}",
        if stored.encryption { "encrypted" } else { "plaintext" }
    );
    println!(
        "password commitment: {}",
        if stored.password_commitment.is_some() { "stored" } else { "none" }
    );
    println!(
        "files: {} total, {} sealed, {} plaintext, {} unreadable",
        files.len() + enumeration.denied.len(),
        sealed,
        plain,
        unreadable
    );

    Ok(true)
}

fn report(result: &BatchResult, operation: Operation) {
    println!(
        "{}: {} of {} files processed",
        operation,
        result.succeeded.len(),
        result.total()
    );
    for (path, err) in &result.failed {
        eprintln!("failed: {}: {}", path.display(), err);
    }
    for path in &result.skipped {
        eprintln!("skipped: {}", path.display());
    }
    if !result.failed.is_empty() {
        eprintln!(
            "the vault is in a mixed state; remediate the files above with \
             'vaultlock retry', do not re-run the whole batch"
        );
    }
}

fn read_password(use_stdin: bool, prompt: &str) -> Result<Zeroizing<String>> {
    let mut reader: Box<dyn PasswordReader> = if use_stdin {
        Box::new(StdinPasswordReader)
    } else {
        Box::new(TerminalPasswordReader)
    };
    reader.read_password(prompt)
}

/// Read a password for the encrypt path. In terminal mode, asks twice
/// and requires both entries to match; in stdin mode, a single line.
fn read_new_password(use_stdin: bool) -> Result<Zeroizing<String>> {
    if use_stdin {
        return read_password(true, "");
    }

    let mut reader = TerminalPasswordReader;
    let first = reader.read_password("New password (vaultlock): ")?;
    let second = reader.read_password("Confirm password: ")?;
    if *first != *second {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::PassphraseUnavailable,
            "passwords do not match",
        ));
    }
    Ok(first)
}

//! Password reading for the host CLI
//!
//! The core takes a plain `&str`; these readers are how the CLI obtains
//! it. Passwords live in `Zeroizing<String>` so they are wiped when the
//! operation's call stack unwinds.

use std::io::{self, BufRead, IsTerminal, Write};

use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};

/// Trait for reading passwords from various sources.
pub trait PasswordReader {
    /// Read a password once.
    fn read_password(&mut self, prompt: &str) -> Result<Zeroizing<String>>;
}

/// Returns a fixed password (for testing).
pub struct ConstantPasswordReader {
    password: Zeroizing<String>,
}

impl ConstantPasswordReader {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
        }
    }
}

impl PasswordReader for ConstantPasswordReader {
    fn read_password(&mut self, _prompt: &str) -> Result<Zeroizing<String>> {
        Ok(self.password.clone())
    }
}

/// Reads one line from piped stdin. Used with `--passphrase-stdin`.
pub struct StdinPasswordReader;

impl PasswordReader for StdinPasswordReader {
    fn read_password(&mut self, _prompt: &str) -> Result<Zeroizing<String>> {
        let mut line = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut line).map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("error reading password from stdin: {}", e),
                e,
            )
        })?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

/// Reads from the terminal with no echo.
pub struct TerminalPasswordReader;

impl PasswordReader for TerminalPasswordReader {
    fn read_password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(VaultError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read password from terminal - stdin is not a terminal \
                 (use --passphrase-stdin for piped input)",
            ));
        }

        io::stderr()
            .write_all(prompt.as_bytes())
            .and_then(|()| io::stderr().flush())
            .map_err(|e| {
                VaultError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        // Read password *without echo*
        let password = rpassword::read_password().map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_reader() {
        let mut reader = ConstantPasswordReader::new("test123");
        assert_eq!(&*reader.read_password("pw: ").unwrap(), "test123");
        assert_eq!(&*reader.read_password("pw: ").unwrap(), "test123");
    }

    /// Tests the terminal reader. This is ignored by default and must be run
    /// explicitly and with human input:
    ///
    /// cargo test test_terminal_reader_interactive -- --ignored --nocapture
    #[test]
    #[ignore]
    fn test_terminal_reader_interactive() {
        let mut reader = TerminalPasswordReader;
        let password = reader.read_password("Please enter a test password: ").unwrap();
        assert!(!password.is_empty(), "Expected non-empty password");
    }
}

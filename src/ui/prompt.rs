//! Passphrase prompt.

use anyhow::{Result, anyhow};
use inquire::{Password, PasswordDisplayMode};

use ecryptfs_rs::SecretBytes;

/// Asks for the mount passphrase on the terminal, masked.
///
/// No confirmation is asked: a mistyped passphrase shows up as a salt or
/// signature mismatch rather than silently producing new data.
pub fn passphrase() -> Result<SecretBytes> {
    Password::new("Passphrase:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .map(SecretBytes::from)
        .map_err(|e| anyhow!("passphrase input failed: {e}"))
}

/// Uses `given` when present, otherwise prompts.
pub fn passphrase_or_prompt(given: Option<String>) -> Result<SecretBytes> {
    given.map_or_else(passphrase, |p| Ok(SecretBytes::from(p)))
}

//! Common type definitions for the codec.
//!
//! # Overview
//!
//! - [`Salt`]: the 8-byte salt mixed into key derivation
//! - [`Signature`]: the 8-byte fingerprint of a session key
//! - [`Credentials`]: salt, session key and signature derived once per passphrase
//! - [`Task`] / [`TaskResult`]: units of work for the parallel page pipeline

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rayon::prelude::*;
use subtle::ConstantTimeEq;

use crate::cipher::{derive_session_key, derive_signature};
use crate::config::{SALT_SIZE, SIGNATURE_SIZE};
use crate::error::{Error, Result};
use crate::secret::SessionKey;

/// The 8 raw salt bytes, conventionally written as 16 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// The salt `ecryptfs-add-passphrase` uses when none is configured.
    pub const DEFAULT: Self = Self([0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);

    #[inline]
    pub const fn new(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parses the 16-hex-character rendering.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSalt`] when the text is not exactly 16 hex digits.
    pub fn from_hex(text: &str) -> Result<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        hex::decode_to_slice(text, &mut bytes).map_err(|e| Error::InvalidSalt(format!("{text:?}: {e}")))?;
        Ok(Self(bytes))
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

impl Default for Salt {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for Salt {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Display for Salt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Fingerprint of a session key: the first 8 bytes of its SHA-512 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    #[inline]
    pub const fn new(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Reads a signature from the front of `data`.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        data.get(..SIGNATURE_SIZE).and_then(|s| s.try_into().ok()).map(Self)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Constant-time comparison.
    #[inline]
    pub fn matches(&self, other: &Self) -> bool {
        bool::from(self.0.ct_eq(&other.0))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Key material derived once from a passphrase and salt.
///
/// Immutable after construction and safe to share across threads; every
/// file and filename operation borrows it read-only.
#[derive(Debug)]
pub struct Credentials {
    salt: Salt,
    session_key: SessionKey,
    signature: Signature,
}

impl Credentials {
    /// Runs the full 65536-round derivation.
    pub fn derive(passphrase: &[u8], salt: Salt) -> Self {
        let session_key = derive_session_key(passphrase, &salt);
        let signature = derive_signature(&session_key);
        tracing::debug!(%salt, %signature, "derived credentials");
        Self { salt, session_key, signature }
    }

    /// Derives credentials for several passphrases in parallel.
    ///
    /// Each derivation is sequential on its own; independent passphrases
    /// run on separate worker threads. Output order matches input order.
    pub fn derive_batch<P: AsRef<[u8]> + Sync>(passphrases: &[P], salt: Salt) -> Vec<Self> {
        passphrases.par_iter().map(|p| Self::derive(p.as_ref(), salt)).collect()
    }

    #[inline]
    pub const fn salt(&self) -> &Salt {
        &self.salt
    }

    #[inline]
    pub const fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    #[inline]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// A run of consecutive ciphertext pages to decrypt.
pub struct Task {
    /// Whole ciphertext pages.
    pub data: Vec<u8>,

    /// Sequential task number; the writer reassembles output in this order.
    pub index: u64,
}

/// Result of processing a [`Task`].
pub struct TaskResult {
    /// Decrypted pages (empty if an error occurred).
    pub data: Vec<u8>,

    /// Failure, `None` on success.
    pub error: Option<Error>,

    /// The originating task number.
    pub index: u64,

    /// Ciphertext bytes consumed, for progress tracking.
    pub size: usize,
}

impl TaskResult {
    #[inline]
    pub fn ok(index: u64, data: Vec<u8>, size: usize) -> Self {
        Self { data, error: None, index, size }
    }

    #[inline]
    pub fn err(index: u64, error: Error) -> Self {
        Self { data: Vec::new(), error: Some(error), index, size: 0 }
    }
}

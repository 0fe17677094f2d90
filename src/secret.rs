use secrecy::{ExposeSecret, SecretBox, SecretSlice};

use crate::config::SESSION_KEY_SIZE;
use crate::error::{Error, Result};

/// Variable-length secret bytes (passphrases, content keys).
#[derive(Clone)]
pub struct SecretBytes {
    inner: SecretSlice<u8>,
}

impl SecretBytes {
    pub fn new(data: &[u8]) -> Self {
        Self { inner: SecretSlice::from(data.to_vec()) }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { inner: SecretSlice::from(data) }
    }

    pub fn expose_secret(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for SecretBytes {
    fn from(value: String) -> Self {
        Self::from_vec(value.into_bytes())
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([... {} bytes ...])", self.len())
    }
}

/// The 64-byte key derived from a passphrase and salt.
///
/// Every cipher key used by the codec is a prefix of this value.
pub struct SessionKey {
    inner: SecretBox<[u8; SESSION_KEY_SIZE]>,
}

impl SessionKey {
    pub fn new(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { inner: SecretBox::new(Box::new(bytes)) }
    }

    pub fn expose_secret(&self) -> &[u8; SESSION_KEY_SIZE] {
        self.inner.expose_secret()
    }

    /// Returns the first `len` bytes, the key material for a cipher of that key length.
    pub fn prefix(&self, len: usize) -> Result<&[u8]> {
        self.inner.expose_secret().get(..len).ok_or_else(|| Error::InvalidInput(format!("key length {len} exceeds session key size {SESSION_KEY_SIZE}")))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

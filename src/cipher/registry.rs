//! Cipher registry: wire codes, families and key lengths.
//!
//! The supported set is a closed table. Adding a cipher means adding a
//! [`CipherFamily`] variant, a row in [`REGISTRY`] and an arm in
//! [`BlockCipher::new`](super::BlockCipher::new).

use std::fmt::{Display, Formatter};

use strum::{Display as StrumDisplay, EnumString};

use crate::config::{DEFAULT_BLOWFISH_KEY_BYTES, DEFAULT_KEY_BYTES, DES3_KEY_BYTES};
use crate::error::{Error, Result};

/// Block cipher family, named as on the mount command line.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CipherFamily {
    Aes,
    Blowfish,
    #[strum(to_string = "des3", serialize = "des3_ede")]
    Des3,
}

impl CipherFamily {
    /// Block size in bytes.
    #[inline]
    pub const fn block_size(self) -> usize {
        match self {
            Self::Aes => 16,
            Self::Blowfish | Self::Des3 => 8,
        }
    }

    /// Whether the family can be keyed with `key_bytes` bytes.
    pub const fn accepts(self, key_bytes: usize) -> bool {
        match self {
            Self::Aes => matches!(key_bytes, 16 | 24 | 32),
            Self::Blowfish => key_bytes >= 4 && key_bytes <= 56,
            Self::Des3 => key_bytes == DES3_KEY_BYTES,
        }
    }

    /// Key length used when the caller does not name one.
    pub const fn default_key_bytes(self) -> usize {
        match self {
            Self::Aes => DEFAULT_KEY_BYTES,
            Self::Blowfish => DEFAULT_BLOWFISH_KEY_BYTES,
            Self::Des3 => DES3_KEY_BYTES,
        }
    }
}

/// Key length of a registry row: fixed, or chosen by the caller.
#[derive(Clone, Copy)]
enum KeyLength {
    Fixed(usize),
    Variable,
}

/// Supported wire codes.
const REGISTRY: &[(u8, CipherFamily, KeyLength)] = &[
    (0x02, CipherFamily::Des3, KeyLength::Fixed(24)),
    (0x04, CipherFamily::Blowfish, KeyLength::Variable),
    (0x07, CipherFamily::Aes, KeyLength::Fixed(16)),
    (0x08, CipherFamily::Aes, KeyLength::Fixed(24)),
    (0x09, CipherFamily::Aes, KeyLength::Fixed(32)),
];

/// Codes defined by the filesystem that this codec does not decrypt.
const RESERVED: &[(u8, &str)] = &[(0x01, "rsa"), (0x03, "cast5"), (0x0a, "twofish"), (0x0b, "cast6")];

/// A resolved cipher: wire code, family and key length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CipherSpec {
    code: u8,
    family: CipherFamily,
    key_bytes: usize,
}

impl CipherSpec {
    /// Resolves a family and key length to its registry entry.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedCipher`] when no entry matches.
    pub fn new(family: CipherFamily, key_bytes: usize) -> Result<Self> {
        wire_code_for(family, key_bytes).map(|code| Self { code, family, key_bytes })
    }

    /// Resolves a wire code.
    ///
    /// `key_bytes_hint` is only consulted for families whose code does not
    /// pin the key length (Blowfish).
    pub fn from_wire_code(code: u8, key_bytes_hint: usize) -> Result<Self> {
        cipher_for_wire_code(code, key_bytes_hint)
    }

    #[inline]
    pub const fn code(&self) -> u8 {
        self.code
    }

    #[inline]
    pub const fn family(&self) -> CipherFamily {
        self.family
    }

    #[inline]
    pub const fn key_bytes(&self) -> usize {
        self.key_bytes
    }

    #[inline]
    pub const fn block_size(&self) -> usize {
        self.family.block_size()
    }

    /// Length of `key_bytes` rounded up to a whole number of blocks.
    #[inline]
    pub const fn wrapped_key_size(&self) -> usize {
        self.key_bytes.next_multiple_of(self.family.block_size())
    }
}

impl Display for CipherSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.family, self.key_bytes)
    }
}

/// Maps a wire code to a cipher spec.
///
/// # Errors
///
/// [`Error::UnsupportedCipher`] for unknown and reserved codes, and for a
/// Blowfish hint outside 4..=56 bytes.
pub fn cipher_for_wire_code(code: u8, key_bytes_hint: usize) -> Result<CipherSpec> {
    let Some(&(_, family, length)) = REGISTRY.iter().find(|(c, ..)| *c == code) else {
        return Err(match RESERVED.iter().find(|(c, _)| *c == code) {
            Some((_, name)) => Error::UnsupportedCipher(format!("{name} (code {code:#04x}) is not supported")),
            None => Error::UnsupportedCipher(format!("unknown cipher code {code:#04x}")),
        });
    };

    let key_bytes = match length {
        KeyLength::Fixed(n) => n,
        KeyLength::Variable if family.accepts(key_bytes_hint) => key_bytes_hint,
        KeyLength::Variable => return Err(Error::UnsupportedCipher(format!("{family} with a {key_bytes_hint}-byte key"))),
    };

    Ok(CipherSpec { code, family, key_bytes })
}

/// Maps a family and key length to its wire code.
///
/// # Errors
///
/// [`Error::UnsupportedCipher`] when the pair has no registry entry.
pub fn wire_code_for(family: CipherFamily, key_bytes: usize) -> Result<u8> {
    REGISTRY
        .iter()
        .find(|(_, f, length)| {
            *f == family
                && match length {
                    KeyLength::Fixed(n) => *n == key_bytes,
                    KeyLength::Variable => family.accepts(key_bytes),
                }
        })
        .map(|(code, ..)| *code)
        .ok_or_else(|| Error::UnsupportedCipher(format!("{family} with a {key_bytes}-byte key")))
}

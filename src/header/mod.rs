//! File header parsing and construction.
//!
//! The header occupies the first 8192 bytes (two 4096-byte extents) of every
//! encrypted file:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 8 | declared plaintext size (i64 BE) |
//! | 8 | 4 | marker1 |
//! | 12 | 4 | marker2, `marker1 == marker2 ^ 0x3c81b7f5` |
//! | 16 | 1 | version |
//! | 17 | 2 | reserved |
//! | 19 | 1 | flags |
//! | 20 | 4 | extent size (i32 BE, 4096) |
//! | 24 | 2 | extent count (i16 BE, 2) |
//! | 26 | .. | tag 3 packet: salt at 32, S2K count at 40, wrapped key at 41 |
//! | .. | .. | tag 11 packet: auth-token signature |

use std::io::Read;

use crate::config::HEADER_SIZE;
use crate::error::{Error, Result};
use crate::types::{Salt, Signature};

pub mod deserializer;
pub mod serializer;

pub use serializer::SerializeParams;

/// A parsed, validated file header.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub(crate) declared_size: u64,
    pub(crate) marker1: u32,
    pub(crate) marker2: u32,
    pub(crate) version: u8,
    pub(crate) flags: u8,
    pub(crate) extent_size: i32,
    pub(crate) extent_count: i16,
    pub(crate) cipher_code: u8,
    pub(crate) salt: Salt,
    pub(crate) iterations: u64,
    pub(crate) wrapped_key_area: Vec<u8>,
    pub(crate) wrapped_key_len: Option<usize>,
    pub(crate) signature: Option<Signature>,
}

impl FileHeader {
    /// Reads exactly [`HEADER_SIZE`] bytes from `reader` and parses them.
    ///
    /// # Errors
    ///
    /// - [`Error::TruncatedInput`] if the stream ends early
    /// - [`Error::MarkerMismatch`] if the markers fail the XOR relation
    /// - [`Error::InvalidHeader`] for bad extent geometry or a negative size
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes).map_err(|e| Error::from_read(e, "file header"))?;
        deserializer::parse(&bytes)
    }

    /// Builds a complete header.
    pub fn serialize(params: &SerializeParams<'_>) -> Result<Vec<u8>> {
        serializer::serialize(params)
    }

    #[inline]
    pub const fn declared_size(&self) -> u64 {
        self.declared_size
    }

    #[inline]
    pub const fn markers(&self) -> (u32, u32) {
        (self.marker1, self.marker2)
    }

    #[inline]
    pub const fn version(&self) -> u8 {
        self.version
    }

    #[inline]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    #[inline]
    pub const fn extent_size(&self) -> i32 {
        self.extent_size
    }

    #[inline]
    pub const fn extent_count(&self) -> i16 {
        self.extent_count
    }

    /// Cipher code recorded in the tag 3 packet.
    #[inline]
    pub const fn cipher_code(&self) -> u8 {
        self.cipher_code
    }

    #[inline]
    pub const fn salt(&self) -> &Salt {
        &self.salt
    }

    /// Hash iteration count decoded from the S2K count byte.
    #[inline]
    pub const fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Auth-token signature from the tag 11 packet, when present.
    #[inline]
    pub const fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Wrapped key length implied by the tag 3 packet length, when readable.
    #[inline]
    pub const fn recorded_wrapped_key_len(&self) -> Option<usize> {
        self.wrapped_key_len
    }

    /// The first `len` bytes of the wrapped key field.
    pub fn wrapped_key(&self, len: usize) -> Result<&[u8]> {
        self.wrapped_key_area.get(..len).ok_or_else(|| Error::InvalidHeader(format!("wrapped key of {len} bytes does not fit in the header")))
    }
}

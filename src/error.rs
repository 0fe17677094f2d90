//! # Error Types
//!
//! Every codec operation returns [`Result<T>`], whose error side is [`Error`].
//! Each failure kind is its own variant so callers can tell a wrong passphrase
//! from a corrupted file without inspecting messages.

use thiserror::Error;

/// The error type for all codec operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The two header marker words fail the XOR relation.
    ///
    /// The stream is not a recognized encrypted file.
    #[error("not an encrypted file: marker {marker1:#010x} does not match {marker2:#010x}")]
    MarkerMismatch { marker1: u32, marker2: u32 },

    /// The header salt differs from the credentials' salt.
    #[error("salt mismatch: header has {found}, credentials use {expected}")]
    SaltMismatch { expected: String, found: String },

    /// The filename packet was produced with different credentials.
    #[error("signature mismatch: packet has {found}, credentials have {expected}")]
    SignatureMismatch { expected: String, found: String },

    /// No registry entry for the wire code or family/key-length pair.
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),

    /// Malformed filename packet.
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// The input ended before a required fixed-size region was complete.
    #[error("truncated input: {0}")]
    TruncatedInput(String),

    /// Header fields hold values outside the accepted layout.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Salt text is not 16 hexadecimal characters.
    #[error("invalid salt: {0}")]
    InvalidSalt(String),

    /// Caller-supplied argument is unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operating system's random source failed.
    #[error("random number generator failed: {0}")]
    Random(String),

    /// Read attempted on a closed file handle.
    #[error("file handle is closed")]
    Closed,

    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps an `UnexpectedEof` I/O error to [`Error::TruncatedInput`].
    pub(crate) fn from_read(err: std::io::Error, what: &str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof { Self::TruncatedInput(what.to_owned()) } else { Self::Io(err) }
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::*;

    #[test]
    fn test_eof_becomes_truncated() {
        let err = Error::from_read(std::io::Error::from(ErrorKind::UnexpectedEof), "header");
        assert!(matches!(err, Error::TruncatedInput(ref what) if what == "header"));
    }

    #[test]
    fn test_other_io_kept() {
        let err = Error::from_read(std::io::Error::from(ErrorKind::PermissionDenied), "header");
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_display_marker() {
        let err = Error::MarkerMismatch { marker1: 1, marker2: 2 };
        assert_eq!(err.to_string(), "not an encrypted file: marker 0x00000001 does not match 0x00000002");
    }
}

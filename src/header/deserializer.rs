//! Header deserialization.
//!
//! # Validation order
//!
//! 1. Marker words (the file is an encrypted file at all)
//! 2. Extent size and count
//! 3. Declared size is not negative
//!
//! Salt comparison needs credentials and happens when the file is opened.
//! Unusual but readable values (version, flags, S2K count, packet tags) are
//! logged and tolerated.

use tracing::{debug, warn};

use crate::config::{
    FILE_VERSION, FLAG_ENCRYPTED, HASH_ITERATIONS, HEADER_EXTENT_COUNT, HEADER_EXTENT_SIZE, HEADER_SIZE, MAGIC_MARKER, PACKET_SET_OFFSET, SALT_SIZE, SIGNATURE_SIZE, TAG_3_PACKET, TAG_11_FILENAME,
    TAG_11_FORMAT, TAG_11_PACKET,
};
use crate::error::{Error, Result};
use crate::header::FileHeader;
use crate::packet;
use crate::types::{Salt, Signature};

/// Offset of the tag 3 cipher code.
const CIPHER_CODE_OFFSET: usize = 29;

/// Offset of the salt.
const SALT_OFFSET: usize = 32;

/// Offset of the S2K count byte.
const S2K_COUNT_OFFSET: usize = 40;

/// Offset of the wrapped key.
const WRAPPED_KEY_OFFSET: usize = 41;

/// Bytes kept from the wrapped key offset; covers the largest key of any family.
const WRAPPED_KEY_AREA: usize = 64;

/// Tag 3 body bytes preceding the wrapped key: version, cipher, S2K spec, hash, salt, count.
const TAG_3_FIXED_BODY: usize = 13;

/// Parses a complete header.
///
/// # Errors
///
/// See [`FileHeader::read_from`].
pub fn parse(data: &[u8]) -> Result<FileHeader> {
    if data.len() < HEADER_SIZE {
        return Err(Error::TruncatedInput(format!("file header needs {HEADER_SIZE} bytes, got {}", data.len())));
    }

    let marker1 = be_u32(data, 8);
    let marker2 = be_u32(data, 12);
    if marker1 != marker2 ^ MAGIC_MARKER {
        return Err(Error::MarkerMismatch { marker1, marker2 });
    }

    let extent_size = i32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    if extent_size != HEADER_EXTENT_SIZE {
        return Err(Error::InvalidHeader(format!("extent size {extent_size}, expected {HEADER_EXTENT_SIZE}")));
    }

    let extent_count = i16::from_be_bytes([data[24], data[25]]);
    if extent_count != HEADER_EXTENT_COUNT {
        return Err(Error::InvalidHeader(format!("extent count {extent_count}, expected {HEADER_EXTENT_COUNT}")));
    }

    let size = i64::from_be_bytes([data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7]]);
    let declared_size = u64::try_from(size).map_err(|_| Error::InvalidHeader(format!("negative file size {size}")))?;

    let version = data[16];
    if version != FILE_VERSION {
        warn!(version, "unexpected header version");
    }

    let flags = data[19];
    if flags & FLAG_ENCRYPTED == 0 {
        warn!(flags, "header does not mark the file as encrypted");
    }

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&data[SALT_OFFSET..SALT_OFFSET + SALT_SIZE]);

    let iterations = s2k_count(data[S2K_COUNT_OFFSET]);
    if iterations != HASH_ITERATIONS as u64 {
        warn!(iterations, "unexpected S2K iteration count");
    }

    let (wrapped_key_len, tag_11_offset) = parse_tag_3(data);
    let signature = tag_11_offset.and_then(|offset| parse_tag_11(data, offset));

    let header = FileHeader {
        declared_size,
        marker1,
        marker2,
        version,
        flags,
        extent_size,
        extent_count,
        cipher_code: data[CIPHER_CODE_OFFSET],
        salt: Salt::new(salt),
        iterations,
        wrapped_key_area: data[WRAPPED_KEY_OFFSET..WRAPPED_KEY_OFFSET + WRAPPED_KEY_AREA].to_vec(),
        wrapped_key_len,
        signature,
    };

    debug!(
        size = header.declared_size,
        version = header.version,
        cipher_code = header.cipher_code,
        salt = %header.salt,
        signature = ?header.signature.map(|s| s.to_string()),
        "parsed file header"
    );

    Ok(header)
}

/// Decodes an OpenPGP S2K count byte.
#[inline]
pub fn s2k_count(encoded: u8) -> u64 {
    (16 + u64::from(encoded & 15)) << ((encoded >> 4) + 6)
}

/// Returns the wrapped key length and the offset just past the tag 3 packet.
fn parse_tag_3(data: &[u8]) -> (Option<usize>, Option<usize>) {
    if data[PACKET_SET_OFFSET] != TAG_3_PACKET {
        warn!(tag = data[PACKET_SET_OFFSET], "expected tag 3 packet at offset {PACKET_SET_OFFSET}");
        return (None, None);
    }

    match packet::parse_length(&data[PACKET_SET_OFFSET + 1..]) {
        Ok((body, 1)) if body >= TAG_3_FIXED_BODY => (Some(body - TAG_3_FIXED_BODY), Some(PACKET_SET_OFFSET + 2 + body)),
        Ok((body, used)) => {
            warn!(body, used, "tag 3 packet length does not match the fixed layout");
            (None, None)
        }
        Err(e) => {
            warn!(error = %e, "unreadable tag 3 packet length");
            (None, None)
        }
    }
}

/// Reads the signature from a tag 11 literal packet at `offset`.
fn parse_tag_11(data: &[u8], offset: usize) -> Option<Signature> {
    if data.get(offset) != Some(&TAG_11_PACKET) {
        debug!(offset, "no tag 11 packet after tag 3");
        return None;
    }

    let (body_len, used) = packet::parse_length(data.get(offset + 1..)?).ok()?;
    let body = data.get(offset + 1 + used..offset + 1 + used + body_len)?;

    // format, name length, name, 4-byte date, signature
    let (&format, rest) = body.split_first()?;
    let (&name_len, rest) = rest.split_first()?;
    let name = rest.get(..usize::from(name_len))?;
    if format != TAG_11_FORMAT || name != TAG_11_FILENAME {
        debug!(format, "tag 11 packet does not carry an auth-token signature");
        return None;
    }

    let signature = Signature::from_slice(rest.get(usize::from(name_len) + 4..)?)?;
    (body.len() == 2 + TAG_11_FILENAME.len() + 4 + SIGNATURE_SIZE).then_some(signature)
}

#[inline]
fn be_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::S2K_COUNT_BYTE;

    const AES_16: &[u8] = include_bytes!("../../testdata/aes-16.raw");

    fn header() -> Vec<u8> {
        AES_16[..HEADER_SIZE].to_vec()
    }

    #[test]
    fn test_parse_fixture() {
        let parsed = parse(&header()).unwrap();
        assert_eq!(parsed.declared_size(), 12);
        assert_eq!(parsed.version(), 3);
        assert_eq!(parsed.flags(), 2);
        assert_eq!(parsed.extent_size(), 4096);
        assert_eq!(parsed.extent_count(), 2);
        assert_eq!(parsed.cipher_code(), 0x07);
        assert_eq!(*parsed.salt(), Salt::DEFAULT);
        assert_eq!(parsed.iterations(), 65536);
        assert_eq!(parsed.recorded_wrapped_key_len(), Some(16));
        assert_eq!(parsed.signature().unwrap().to_string(), "3515cca9baaea1f4");
        assert_eq!(parsed.wrapped_key(16).unwrap(), &AES_16[41..57]);
        let (m1, m2) = parsed.markers();
        assert_eq!(m1, m2 ^ MAGIC_MARKER);
    }

    #[test]
    fn test_s2k_count() {
        assert_eq!(s2k_count(S2K_COUNT_BYTE), 65536);
        assert_eq!(s2k_count(0x00), 1024);
        assert_eq!(s2k_count(0xff), 65_011_712);
    }

    #[test]
    fn test_marker_mismatch() {
        let mut data = header();
        data[15] ^= 1;
        assert!(matches!(parse(&data), Err(Error::MarkerMismatch { .. })));
    }

    #[test]
    fn test_marker_checked_first() {
        let mut data = header();
        data[15] ^= 1;
        data[20..24].copy_from_slice(&8192i32.to_be_bytes());
        assert!(matches!(parse(&data), Err(Error::MarkerMismatch { .. })));
    }

    #[test]
    fn test_bad_extents() {
        let mut data = header();
        data[20..24].copy_from_slice(&8192i32.to_be_bytes());
        assert!(matches!(parse(&data), Err(Error::InvalidHeader(_))));

        let mut data = header();
        data[24..26].copy_from_slice(&3i16.to_be_bytes());
        assert!(matches!(parse(&data), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_negative_size() {
        let mut data = header();
        data[0..8].copy_from_slice(&(-1i64).to_be_bytes());
        assert!(matches!(parse(&data), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(parse(&AES_16[..100]), Err(Error::TruncatedInput(_))));
    }

    #[test]
    fn test_missing_packets_tolerated() {
        let mut data = header();
        data[PACKET_SET_OFFSET] = 0;
        let parsed = parse(&data).unwrap();
        assert_eq!(parsed.recorded_wrapped_key_len(), None);
        assert!(parsed.signature().is_none());
        assert_eq!(*parsed.salt(), Salt::DEFAULT);
    }
}

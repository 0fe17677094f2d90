//! Packet length field codec.
//!
//! Sizes below 192 take one byte. Sizes up to 8383 take two bytes:
//! `((size - 192) / 256) + 192` followed by `(size - 192) % 256`. Longer
//! forms exist in OpenPGP but never appear in eCryptfs packets.

use crate::config::{PACKET_LEN_ONE_BYTE_MAX, PACKET_LEN_TWO_BYTE_MAX};
use crate::error::{Error, Result};

/// First byte value that starts a two-byte length.
const TWO_BYTE_LEAD: u8 = 192;

/// First byte value past the two-byte range.
const TWO_BYTE_END: u8 = 224;

/// Appends the encoded form of `size` to `out`.
///
/// # Errors
///
/// [`Error::InvalidInput`] if `size` exceeds the two-byte range.
pub fn write_length(out: &mut Vec<u8>, size: usize) -> Result<()> {
    if size <= PACKET_LEN_ONE_BYTE_MAX {
        out.push(size as u8);
    } else if size <= PACKET_LEN_TWO_BYTE_MAX {
        let rest = size - usize::from(TWO_BYTE_LEAD);
        out.push((rest / 256) as u8 + TWO_BYTE_LEAD);
        out.push((rest % 256) as u8);
    } else {
        return Err(Error::InvalidInput(format!("packet size {size} exceeds {PACKET_LEN_TWO_BYTE_MAX}")));
    }

    Ok(())
}

/// Parses a length field at the start of `data`.
///
/// Returns `(size, bytes consumed)`.
///
/// # Errors
///
/// [`Error::InvalidPacket`] for an empty or cut-off field, or a first byte
/// outside the one- and two-byte forms.
pub fn parse_length(data: &[u8]) -> Result<(usize, usize)> {
    match *data {
        [] => Err(Error::InvalidPacket("missing length field".into())),
        [first, ..] if first < TWO_BYTE_LEAD => Ok((usize::from(first), 1)),
        [first, second, ..] if first < TWO_BYTE_END => Ok(((usize::from(first - TWO_BYTE_LEAD) << 8) + usize::from(second) + usize::from(TWO_BYTE_LEAD), 2)),
        [first] if first < TWO_BYTE_END => Err(Error::InvalidPacket("truncated two-byte length field".into())),
        [first, ..] => Err(Error::InvalidPacket(format!("unsupported length encoding {first:#04x}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        write_length(&mut out, size).unwrap();
        out
    }

    #[test]
    fn test_one_byte_form() {
        assert_eq!(encoded(0), [0]);
        assert_eq!(encoded(41), [41]);
        assert_eq!(encoded(191), [191]);
        assert_eq!(parse_length(&[191, 0xff]).unwrap(), (191, 1));
    }

    #[test]
    fn test_two_byte_form() {
        assert_eq!(encoded(192), [192, 0]);
        assert_eq!(encoded(200), [192, 8]);
        assert_eq!(encoded(8383), [223, 255]);
        assert_eq!(parse_length(&[192, 0]).unwrap(), (192, 2));
        assert_eq!(parse_length(&[193, 4, 9]).unwrap(), (452, 2));
        assert_eq!(parse_length(&[223, 255]).unwrap(), (8383, 2));
    }

    #[test]
    fn test_boundaries_roundtrip() {
        for size in [0, 1, 190, 191, 192, 193, 447, 448, 8382, 8383] {
            let bytes = encoded(size);
            assert_eq!(parse_length(&bytes).unwrap(), (size, bytes.len()), "{size}");
        }
    }

    #[test]
    fn test_rejects_too_large() {
        assert!(matches!(write_length(&mut Vec::new(), 8384), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(parse_length(&[]), Err(Error::InvalidPacket(_))));
        assert!(matches!(parse_length(&[200]), Err(Error::InvalidPacket(_))));
        assert!(matches!(parse_length(&[224, 0]), Err(Error::InvalidPacket(_))));
        assert!(matches!(parse_length(&[255]), Err(Error::InvalidPacket(_))));
    }
}

//! 6-bit filename transcoding.
//!
//! Packs three bytes into four symbols from a 64-character alphabet that is
//! legal in any path component. Purely a representation change; it carries
//! no cryptographic weight.

use crate::error::{Error, Result};

/// Symbol table, indexed by 6-bit value.
pub const ALPHABET: &[u8; 64] = b"-.0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const INVALID: u8 = 0xff;

/// Reverse lookup, built at compile time.
const REVERSE: [u8; 256] = {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Encodes bytes to symbols.
///
/// A trailing group shorter than three bytes is zero-filled, so the output
/// length is always `4 * ceil(len / 3)`.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);

    for chunk in data.chunks(3) {
        let mut group = [0u8; 3];
        group[..chunk.len()].copy_from_slice(chunk);
        let bits = (u32::from(group[0]) << 16) | (u32::from(group[1]) << 8) | u32::from(group[2]);

        for shift in [18, 12, 6, 0] {
            out.push(char::from(ALPHABET[((bits >> shift) & 0x3f) as usize]));
        }
    }

    out
}

/// Decodes symbols to bytes.
///
/// Emits only complete bytes: `floor(6 * len / 8)` of them.
///
/// # Errors
///
/// [`Error::InvalidPacket`] for any character outside [`ALPHABET`].
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 3 / 4);
    let mut acc: u32 = 0;
    let mut bits = 0u32;

    for (pos, &symbol) in text.as_bytes().iter().enumerate() {
        let value = REVERSE[usize::from(symbol)];
        if value == INVALID {
            return Err(Error::InvalidPacket(format!("invalid character {:?} at offset {pos}", char::from(symbol))));
        }

        acc = (acc << 6) | u32::from(value);
        bits += 6;

        if bits >= 8 {
            bits -= 8;
            out.push(((acc >> bits) & 0xff) as u8);
            acc &= (1 << bits) - 1;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_alphabet_order() {
        assert_eq!(encode(&[0, 0, 0]), "----");
        assert_eq!(encode(&[0xff, 0xff, 0xff]), "zzzz");
        assert_eq!(encode(&[0x00, 0x10, 0x83]), "-.01");
    }

    #[test]
    fn test_tag70_prefix() {
        // 0x46 is the packet tag; every encrypted name starts with "F".
        assert!(encode(&[0x46, 0x00, 0x00]).starts_with('F'));
    }

    #[test]
    fn test_partial_group_zero_filled() {
        assert_eq!(encode(&[0xff]), encode(&[0xff, 0, 0]));
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_decode_partial() {
        assert_eq!(decode("zz").unwrap(), [0xff]);
        assert_eq!(decode("z").unwrap(), Vec::<u8>::new());
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_rejects_foreign_characters() {
        for text in ["ab+c", "abc=", "ab c", "abcé"] {
            assert!(matches!(decode(text), Err(Error::InvalidPacket(_))), "{text}");
        }
    }

    proptest! {
        #[test]
        fn prop_bytes_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..64).prop_map(|mut v| { v.truncate(v.len() / 3 * 3); v })) {
            prop_assert_eq!(decode(&encode(&data)).unwrap(), data);
        }

        #[test]
        fn prop_text_roundtrip(symbols in proptest::collection::vec(0usize..64, 0..64).prop_map(|mut v| { v.truncate(v.len() / 4 * 4); v })) {
            let text: String = symbols.iter().map(|&i| char::from(ALPHABET[i])).collect();
            prop_assert_eq!(encode(&decode(&text).unwrap()), text);
        }
    }
}

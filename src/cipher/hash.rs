//! MD5-based IV derivation for file pages.
//!
//! The root IV is `MD5(content_key)`. Each page's IV is
//! `MD5(root_iv || decimal(page) zero-padded to 16 bytes)`, matching the
//! kernel's `ecryptfs_derive_iv`, which formats the page offset with `%lld`.

use md5::{Digest, Md5};

/// Size of an MD5 digest and of every derived IV.
pub const IV_SIZE: usize = 16;

/// Computes the root IV of a file from its content key.
pub fn root_iv(content_key: &[u8]) -> [u8; IV_SIZE] {
    Md5::digest(content_key).into()
}

/// Derives the IV for page `index`.
pub fn page_iv(root_iv: &[u8; IV_SIZE], index: u64) -> [u8; IV_SIZE] {
    let mut source = [0u8; IV_SIZE * 2];
    source[..IV_SIZE].copy_from_slice(root_iv);

    // snprintf into 16 bytes keeps at most 15 digits before the terminator.
    let digits = index.to_string();
    let len = digits.len().min(IV_SIZE - 1);
    source[IV_SIZE..IV_SIZE + len].copy_from_slice(&digits.as_bytes()[..len]);

    Md5::digest(source).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_iv_is_md5() {
        assert_eq!(hex::encode(root_iv(b"")), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(hex::encode(root_iv(b"abc")), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_single_digit_pages_use_ascii_byte() {
        let root = [0xabu8; IV_SIZE];
        for page in 0u64..10 {
            let mut source = Vec::from(root);
            source.extend_from_slice(&(0x30 + page).to_le_bytes());
            source.extend_from_slice(&[0u8; 8]);
            let expected: [u8; IV_SIZE] = Md5::digest(&source).into();
            assert_eq!(page_iv(&root, page), expected, "page {page}");
        }
    }

    #[test]
    fn test_multi_digit_pages() {
        let root = [0x11u8; IV_SIZE];
        let mut source = Vec::from(root);
        source.extend_from_slice(b"12\0\0\0\0\0\0\0\0\0\0\0\0\0\0");
        let expected: [u8; IV_SIZE] = Md5::digest(&source).into();
        assert_eq!(page_iv(&root, 12), expected);
        assert_ne!(page_iv(&root, 1), page_iv(&root, 10));
    }

    #[test]
    fn test_long_index_truncated() {
        let root = [0u8; IV_SIZE];
        assert_eq!(page_iv(&root, u64::MAX), page_iv(&root, 184_467_440_737_095));
    }
}

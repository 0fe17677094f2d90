//! Builds complete encrypted files from plaintext.
//!
//! The output has the same layout the filesystem produces: an 8192-byte
//! header carrying the wrapped content key, then the plaintext in CBC pages
//! with the last page zero-filled.

use tracing::debug;
use zeroize::Zeroizing;

use crate::cipher::{CipherSpec, Mode, instantiate, random_bytes};
use crate::config::{HEADER_SIZE, PAGE_SIZE};
use crate::error::Result;
use crate::file::PageCipher;
use crate::header::{FileHeader, SerializeParams};
use crate::types::Credentials;

/// Encrypts `plaintext` into a complete file under `credentials`.
///
/// The content key and marker are drawn from the system random source.
pub fn encrypt_file(plaintext: &[u8], credentials: &Credentials, spec: CipherSpec) -> Result<Vec<u8>> {
    let mut content_key = Zeroizing::new(vec![0u8; spec.key_bytes()]);
    random_bytes(&mut content_key)?;

    let mut marker = [0u8; 4];
    random_bytes(&mut marker)?;

    encrypt_with_key(plaintext, credentials, spec, &content_key, u32::from_be_bytes(marker))
}

/// Encrypts with a fixed content key and marker.
pub(crate) fn encrypt_with_key(plaintext: &[u8], credentials: &Credentials, spec: CipherSpec, content_key: &[u8], marker2: u32) -> Result<Vec<u8>> {
    let pages = PageCipher::new(spec, content_key)?;

    let mut wrapped_key = content_key.to_vec();
    wrapped_key.resize(spec.wrapped_key_size(), 0);
    instantiate(spec, credentials.session_key().prefix(spec.key_bytes())?, Mode::Ecb)?.encrypt(&mut wrapped_key)?;

    let header = FileHeader::serialize(&SerializeParams {
        declared_size: plaintext.len() as u64,
        marker2,
        spec,
        salt: credentials.salt(),
        wrapped_key: &wrapped_key,
        signature: credentials.signature(),
    })?;

    let body_len = plaintext.len().next_multiple_of(PAGE_SIZE);
    let mut out = Vec::with_capacity(HEADER_SIZE + body_len);
    out.extend_from_slice(&header);
    out.extend_from_slice(plaintext);
    out.resize(HEADER_SIZE + body_len, 0);

    for (page, index) in out[HEADER_SIZE..].chunks_exact_mut(PAGE_SIZE).zip(0u64..) {
        pages.encrypt_page(index, page)?;
    }

    debug!(%spec, size = plaintext.len(), pages = body_len / PAGE_SIZE, "encrypted file");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;
    use std::sync::LazyLock;

    use tempfile::tempdir;

    use super::*;
    use crate::cipher::CipherFamily;
    use crate::file::EncryptedFile;
    use crate::types::Salt;

    static TEST: LazyLock<Credentials> = LazyLock::new(|| Credentials::derive(b"Test", Salt::DEFAULT));

    const AES_16: &[u8] = include_bytes!("../../testdata/aes-16.raw");

    fn all_specs() -> Vec<CipherSpec> {
        [(CipherFamily::Aes, 16), (CipherFamily::Aes, 24), (CipherFamily::Aes, 32), (CipherFamily::Blowfish, 16), (CipherFamily::Blowfish, 56), (CipherFamily::Des3, 24)]
            .into_iter()
            .map(|(family, key_bytes)| CipherSpec::new(family, key_bytes).unwrap())
            .collect()
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        let plaintext: Vec<u8> = (0..10_000u32).map(|i| (i * 7) as u8).collect();

        for spec in all_specs() {
            let path = dir.path().join(format!("{}-{}.raw", spec.family(), spec.key_bytes()));
            fs::write(&path, encrypt_file(&plaintext, &TEST, spec).unwrap()).unwrap();

            let mut file = EncryptedFile::open(fs::File::open(&path).unwrap(), &TEST, spec).unwrap();
            assert_eq!(file.read_all().unwrap(), plaintext, "{spec}");
        }
    }

    #[test]
    fn test_layout() {
        let spec = CipherSpec::new(CipherFamily::Aes, 16).unwrap();
        for (len, pages) in [(0usize, 0usize), (1, 1), (PAGE_SIZE, 1), (PAGE_SIZE + 1, 2)] {
            let out = encrypt_file(&vec![1u8; len], &TEST, spec).unwrap();
            assert_eq!(out.len(), HEADER_SIZE + pages * PAGE_SIZE, "{len}");
        }
    }

    #[test]
    fn test_empty_file() {
        let spec = CipherSpec::new(CipherFamily::Aes, 32).unwrap();
        let out = encrypt_file(b"", &TEST, spec).unwrap();
        let mut file = EncryptedFile::open(Cursor::new(out), &TEST, spec).unwrap();
        assert_eq!(file.size(), 0);
        assert!(file.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_reproduces_fixture() {
        let spec = CipherSpec::new(CipherFamily::Aes, 16).unwrap();
        let fixture = FileHeader::read_from(&mut Cursor::new(AES_16)).unwrap();

        let mut content_key = fixture.wrapped_key(16).unwrap().to_vec();
        instantiate(spec, TEST.session_key().prefix(16).unwrap(), Mode::Ecb).unwrap().decrypt(&mut content_key).unwrap();

        let out = encrypt_with_key(b"Hello World\n", &TEST, spec, &content_key, fixture.markers().1).unwrap();
        assert_eq!(out, AES_16);
    }

    #[test]
    fn test_random_keys_differ() {
        let spec = CipherSpec::new(CipherFamily::Aes, 16).unwrap();
        let a = encrypt_file(b"same", &TEST, spec).unwrap();
        let b = encrypt_file(b"same", &TEST, spec).unwrap();
        assert_ne!(a[HEADER_SIZE..], b[HEADER_SIZE..]);
    }
}

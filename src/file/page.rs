//! Per-page CBC encryption keyed by the file's content key.

use tracing::trace;

use crate::cipher::hash::{IV_SIZE, page_iv, root_iv};
use crate::cipher::{BlockCipher, CipherSpec};
use crate::config::PAGE_SIZE;
use crate::error::{Error, Result};

/// The content key of one file, ready to process pages in any order.
///
/// Each page's IV depends only on the root IV and the page index, so pages
/// are independent and `PageCipher` can be shared across threads.
pub struct PageCipher {
    cipher: BlockCipher,
    root_iv: [u8; IV_SIZE],
}

impl PageCipher {
    /// Keys the body cipher and derives the root IV from `content_key`.
    pub fn new(spec: CipherSpec, content_key: &[u8]) -> Result<Self> {
        if content_key.len() != spec.key_bytes() {
            return Err(Error::InvalidInput(format!("content key of {} bytes for {spec}", content_key.len())));
        }

        Ok(Self { cipher: BlockCipher::new(spec, content_key)?, root_iv: root_iv(content_key) })
    }

    #[inline]
    pub const fn root_iv(&self) -> &[u8; IV_SIZE] {
        &self.root_iv
    }

    /// Decrypts one full page in place.
    pub fn decrypt_page(&self, index: u64, page: &mut [u8]) -> Result<()> {
        Self::check_page(page)?;
        trace!(index, "decrypting page");
        self.cipher.decrypt_cbc(&page_iv(&self.root_iv, index), page)
    }

    /// Encrypts one full page in place.
    pub fn encrypt_page(&self, index: u64, page: &mut [u8]) -> Result<()> {
        Self::check_page(page)?;
        self.cipher.encrypt_cbc(&page_iv(&self.root_iv, index), page)
    }

    /// Decrypts consecutive pages starting at `first_index`.
    pub fn decrypt_pages(&self, first_index: u64, data: &mut [u8]) -> Result<()> {
        if !data.len().is_multiple_of(PAGE_SIZE) {
            return Err(Error::TruncatedInput(format!("{} bytes is not a whole number of pages", data.len())));
        }

        data.chunks_exact_mut(PAGE_SIZE).zip(first_index..).try_for_each(|(page, index)| self.decrypt_page(index, page))
    }

    fn check_page(page: &[u8]) -> Result<()> {
        if page.len() == PAGE_SIZE { Ok(()) } else { Err(Error::InvalidInput(format!("page of {} bytes, expected {PAGE_SIZE}", page.len()))) }
    }
}

//! # Encrypted File Decryption
//!
//! [`EncryptedFile`] owns the byte stream of one encrypted file. Opening it
//! parses and validates the header and recovers the content key; reading it
//! decrypts the 4096-byte pages that follow.
//!
//! ## Lifecycle
//!
//! `open` either returns a fully usable handle or an error, never a
//! half-opened one. The stream is released by [`EncryptedFile::close`] or
//! when the handle is dropped, whichever comes first; reads after `close`
//! fail with [`Error::Closed`].
//!
//! ## Output
//!
//! Pages are read until the stream is exhausted. The last page is clamped to
//! the size declared in the header, so padding past the logical end never
//! reaches the caller. A stream that ends mid-page, or before the declared
//! size is reached, is [`Error::TruncatedInput`].

use std::io::{Read, Write};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::cipher::hash::IV_SIZE;
use crate::cipher::{CipherSpec, Mode, instantiate};
use crate::config::PAGE_SIZE;
use crate::error::{Error, Result};
use crate::header::FileHeader;
use crate::types::Credentials;
use crate::worker::Worker;
use crate::worker::reader::read_full;

pub mod page;
pub mod writer;

pub use page::PageCipher;
pub use writer::encrypt_file;

/// An open encrypted file.
pub struct EncryptedFile<R: Read> {
    stream: Option<R>,
    header: FileHeader,
    spec: CipherSpec,
    pages: PageCipher,
    next_page: u64,
    emitted: u64,
}

impl<R: Read> EncryptedFile<R> {
    /// Opens `stream`, validating its header against `credentials`.
    ///
    /// `spec` names the cipher and key length the file was written with;
    /// it keys both the key unwrap and the page decryption.
    ///
    /// # Errors
    ///
    /// - [`Error::TruncatedInput`] if the stream is shorter than the header
    /// - [`Error::MarkerMismatch`] if the stream is not an encrypted file
    /// - [`Error::InvalidHeader`] for bad extent geometry
    /// - [`Error::SaltMismatch`] if the header was written under another salt
    pub fn open(mut stream: R, credentials: &Credentials, spec: CipherSpec) -> Result<Self> {
        let header = FileHeader::read_from(&mut stream)?;

        if header.salt() != credentials.salt() {
            return Err(Error::SaltMismatch { expected: credentials.salt().to_string(), found: header.salt().to_string() });
        }

        if header.cipher_code() != spec.code() {
            warn!(header_code = header.cipher_code(), requested = %spec, "header records a different cipher");
        }
        if let Some(signature) = header.signature().filter(|s| !s.matches(credentials.signature())) {
            warn!(header = %signature, credentials = %credentials.signature(), "header signature differs from credentials");
        }

        let pages = Self::unwrap_content_key(&header, credentials, spec)?;
        debug!(%spec, size = header.declared_size(), "opened encrypted file");

        Ok(Self { stream: Some(stream), header, spec, pages, next_page: 0, emitted: 0 })
    }

    /// Decrypts the wrapped key field with the session key and keys the page cipher.
    fn unwrap_content_key(header: &FileHeader, credentials: &Credentials, spec: CipherSpec) -> Result<PageCipher> {
        let wrapped_len = spec.wrapped_key_size();
        if let Some(recorded) = header.recorded_wrapped_key_len().filter(|&n| n != wrapped_len) {
            warn!(recorded, expected = wrapped_len, "tag 3 packet length disagrees with the key size");
        }

        let mut content_key = Zeroizing::new(header.wrapped_key(wrapped_len)?.to_vec());
        let session_key = credentials.session_key().prefix(spec.key_bytes())?;
        instantiate(spec, session_key, Mode::Ecb)?.decrypt(&mut content_key)?;

        PageCipher::new(spec, &content_key[..spec.key_bytes()])
    }

    #[inline]
    pub const fn header(&self) -> &FileHeader {
        &self.header
    }

    #[inline]
    pub const fn spec(&self) -> CipherSpec {
        self.spec
    }

    /// Base of the per-page IVs, derived from the content key.
    #[inline]
    pub const fn root_iv(&self) -> &[u8; IV_SIZE] {
        self.pages.root_iv()
    }

    /// Plaintext size declared by the header.
    #[inline]
    pub const fn size(&self) -> u64 {
        self.header.declared_size()
    }

    #[inline]
    pub const fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Releases the underlying stream. Further calls have no effect.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(pages = self.next_page, bytes = self.emitted, "closed encrypted file");
        }
    }

    /// Decrypts the next page.
    ///
    /// Returns `None` once the stream is exhausted. The returned plaintext is
    /// clamped to the declared size and may be empty for trailing pages.
    pub fn read_page(&mut self) -> Result<Option<Vec<u8>>> {
        let stream = self.stream.as_mut().ok_or(Error::Closed)?;

        let mut page = vec![0u8; PAGE_SIZE];
        let filled = read_full(stream, &mut page)?;
        if filled == 0 {
            self.check_complete()?;
            return Ok(None);
        }
        if filled < PAGE_SIZE {
            return Err(Error::TruncatedInput(format!("page {} has {filled} of {PAGE_SIZE} bytes", self.next_page)));
        }

        self.pages.decrypt_page(self.next_page, &mut page)?;
        self.next_page += 1;

        page.truncate(self.take_remaining(PAGE_SIZE));
        Ok(Some(page))
    }

    /// Decrypts the whole remaining body into memory.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(page) = self.read_page()? {
            out.extend_from_slice(&page);
        }
        Ok(out)
    }

    /// Streams the remaining plaintext into `output`, one page at a time.
    ///
    /// Returns the number of bytes written.
    pub fn decrypt_to<W: Write>(&mut self, mut output: W) -> Result<u64> {
        let start = self.emitted;
        while let Some(page) = self.read_page()? {
            output.write_all(&page)?;
        }
        output.flush()?;
        Ok(self.emitted - start)
    }

    /// Bytes of plaintext still owed to the caller, consuming up to `available` of them.
    fn take_remaining(&mut self, available: usize) -> usize {
        let remaining = self.size().saturating_sub(self.emitted);
        let n = usize::try_from(remaining).map_or(available, |r| r.min(available));
        self.emitted += n as u64;
        n
    }

    fn check_complete(&self) -> Result<()> {
        if self.emitted < self.size() {
            return Err(Error::TruncatedInput(format!("stream ended after {} of {} declared bytes", self.emitted, self.size())));
        }
        Ok(())
    }
}

impl<R: Read + Send> EncryptedFile<R> {
    /// Decrypts the remaining body on a reader / parallel executor / ordered
    /// writer pipeline.
    ///
    /// Produces exactly the bytes [`decrypt_to`](Self::decrypt_to) would.
    /// `progress` is called with the number of ciphertext bytes completed.
    pub fn decrypt_parallel<W: Write>(&mut self, output: W, progress: Option<&dyn Fn(u64)>) -> Result<u64> {
        let stream = self.stream.as_mut().ok_or(Error::Closed)?;
        let remaining = self.header.declared_size().saturating_sub(self.emitted);

        let report = Worker::new(&self.pages).process(stream, output, self.next_page, remaining, progress)?;

        self.next_page += report.pages;
        self.emitted += report.written;
        self.check_complete()?;
        Ok(report.written)
    }
}

impl<R: Read> Drop for EncryptedFile<R> {
    fn drop(&mut self) {
        self.close();
    }
}

//! Encrypted filename codec (tag 70 packets).
//!
//! An encrypted directory entry is the marker `ECRYPTFS_FNEK_ENCRYPTED.`
//! followed by the 6-bit encoding of:
//!
//! ```text
//! 0x46 | length | signature (8) | cipher code | ECB(junk || 0x00 || name || zero pad) | 0..2 zero bytes
//! ```
//!
//! The length field counts the signature, the cipher code and the ciphertext.
//! The trailing zero bytes pad the packet to a multiple of three so the
//! 6-bit encoding ends on a whole symbol group.

use tracing::{debug, trace};

use crate::cipher::{CipherSpec, Mode, instantiate, random_bytes};
use crate::config::{FILENAME_ALIGNMENT, FILENAME_MIN_CLEARTEXT, FNEK_MARKER, MIN_RANDOM_PREPEND_BYTES, NON_NULL, SIGNATURE_SIZE, TAG_70_MIN_METADATA_SIZE, TAG_70_PACKET};
use crate::encoding;
use crate::error::{Error, Result};
use crate::packet;
use crate::types::{Credentials, Signature};

/// Whether `text` carries the encrypted-name marker.
#[inline]
pub fn is_encrypted(text: &str) -> bool {
    text.starts_with(FNEK_MARKER)
}

/// Checks that a decrypted name is a single path component.
///
/// Decrypted names come from the directory being read and must not be joined
/// onto a path unchecked.
///
/// # Errors
///
/// [`Error::InvalidInput`] for an empty name, `.`, `..`, or a name containing `/`.
pub fn check_component(name: &[u8]) -> Result<()> {
    if name.is_empty() || name == b"." || name == b".." || name.contains(&b'/') {
        return Err(Error::InvalidInput(format!("{:?} is not a single path component", String::from_utf8_lossy(name))));
    }
    Ok(())
}

/// Encrypts and decrypts directory entry names with one set of credentials.
pub struct FilenameCodec<'a> {
    credentials: &'a Credentials,
}

impl<'a> FilenameCodec<'a> {
    #[inline]
    pub const fn new(credentials: &'a Credentials) -> Self {
        Self { credentials }
    }

    /// Encrypts `name` with a freshly generated random junk prefix.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `name` contains a zero byte, or the packet
    /// would exceed the two-byte length form.
    pub fn encrypt(&self, name: &[u8], spec: CipherSpec) -> Result<String> {
        let junk = generate_junk(name.len())?;
        self.encrypt_with_junk(name, spec, &junk)
    }

    /// Encrypts `name` behind a caller-supplied junk prefix.
    ///
    /// The junk must not contain a zero byte, since the first zero separates
    /// it from the name on decryption.
    pub fn encrypt_with_junk(&self, name: &[u8], spec: CipherSpec, junk: &[u8]) -> Result<String> {
        if name.contains(&0) {
            return Err(Error::InvalidInput("filename contains a NUL byte".into()));
        }
        if junk.contains(&0) {
            return Err(Error::InvalidInput("junk prefix contains a zero byte".into()));
        }

        let aligned = aligned_size(junk.len() + 1 + name.len());
        let mut cleartext = Vec::with_capacity(aligned);
        cleartext.extend_from_slice(junk);
        cleartext.push(0);
        cleartext.extend_from_slice(name);
        cleartext.resize(aligned, 0);

        let session_key = self.credentials.session_key().prefix(spec.key_bytes())?;
        instantiate(spec, session_key, Mode::Ecb)?.encrypt(&mut cleartext)?;
        let ciphertext = cleartext;

        let mut packet = Vec::with_capacity(ciphertext.len() + TAG_70_MIN_METADATA_SIZE + 5);
        packet.push(TAG_70_PACKET);
        packet::write_length(&mut packet, ciphertext.len() + TAG_70_MIN_METADATA_SIZE)?;
        packet.extend_from_slice(self.credentials.signature().as_bytes());
        packet.push(spec.code());
        packet.extend_from_slice(&ciphertext);
        packet.resize(packet.len().next_multiple_of(3), 0);

        trace!(name_len = name.len(), packet_len = packet.len(), %spec, "encrypted filename");

        Ok(format!("{FNEK_MARKER}{}", encoding::encode(&packet)))
    }

    /// Decrypts an encoded name.
    ///
    /// Text without the marker is returned unchanged. `key_bytes_hint` is
    /// only used when the packet's cipher code does not fix the key length.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPacket`] for a bad encoding, tag, length or missing separator
    /// - [`Error::TruncatedInput`] if the packet ends inside a field
    /// - [`Error::SignatureMismatch`] if the name was produced with other credentials
    /// - [`Error::UnsupportedCipher`] for an unknown cipher code
    pub fn decrypt(&self, text: &str, key_bytes_hint: usize) -> Result<Vec<u8>> {
        let Some(encoded) = text.strip_prefix(FNEK_MARKER) else {
            return Ok(text.as_bytes().to_vec());
        };

        let packet = encoding::decode(encoded)?;

        match packet.first() {
            Some(&TAG_70_PACKET) => {}
            Some(tag) => return Err(Error::InvalidPacket(format!("expected tag {TAG_70_PACKET:#04x}, found {tag:#04x}"))),
            None => return Err(Error::InvalidPacket("empty packet".into())),
        }

        let (packet_size, used) = packet::parse_length(&packet[1..])?;
        if packet_size < TAG_70_MIN_METADATA_SIZE {
            return Err(Error::InvalidPacket(format!("packet size {packet_size} is smaller than {TAG_70_MIN_METADATA_SIZE}")));
        }
        let mut rest = &packet[1 + used..];

        let found = Signature::from_slice(rest).ok_or_else(|| Error::TruncatedInput("filename packet signature".into()))?;
        let expected = self.credentials.signature();
        if !expected.matches(&found) {
            return Err(Error::SignatureMismatch { expected: expected.to_string(), found: found.to_string() });
        }
        rest = &rest[SIGNATURE_SIZE..];

        let (&code, payload) = rest.split_first().ok_or_else(|| Error::TruncatedInput("filename packet cipher code".into()))?;
        let spec = CipherSpec::from_wire_code(code, key_bytes_hint)?;

        let ciphertext_len = packet_size - TAG_70_MIN_METADATA_SIZE;
        if ciphertext_len == 0 || !ciphertext_len.is_multiple_of(spec.block_size()) {
            return Err(Error::InvalidPacket(format!("ciphertext of {ciphertext_len} bytes is not block aligned for {spec}")));
        }
        let mut cleartext = payload
            .get(..ciphertext_len)
            .ok_or_else(|| Error::TruncatedInput(format!("filename packet declares {ciphertext_len} ciphertext bytes, {} present", payload.len())))?
            .to_vec();

        let session_key = self.credentials.session_key().prefix(spec.key_bytes())?;
        instantiate(spec, session_key, Mode::Ecb)?.decrypt(&mut cleartext)?;

        let separator = cleartext.iter().position(|&b| b == 0).ok_or_else(|| Error::InvalidPacket("no separator between junk and filename".into()))?;
        let name = &cleartext[separator + 1..];
        let end = name.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);

        debug!(%spec, name_len = end, "decrypted filename");

        Ok(name[..end].to_vec())
    }
}

/// Smallest multiple of 16 that holds `len` bytes, and at least 32.
#[inline]
fn aligned_size(len: usize) -> usize {
    len.next_multiple_of(FILENAME_ALIGNMENT).max(FILENAME_MIN_CLEARTEXT)
}

/// Random junk sized so `junk || 0x00 || name` fills the aligned cleartext exactly.
fn generate_junk(name_len: usize) -> Result<Vec<u8>> {
    let unpadded = MIN_RANDOM_PREPEND_BYTES + 1 + name_len;
    let mut junk = vec![0u8; MIN_RANDOM_PREPEND_BYTES + aligned_size(unpadded) - unpadded];
    random_bytes(&mut junk)?;
    junk.iter_mut().filter(|b| **b == 0).for_each(|b| *b = NON_NULL);
    Ok(junk)
}

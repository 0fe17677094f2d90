//! Keyed block ciphers with ECB and CBC modes.
//!
//! ECB is used for filenames and for unwrapping the per-file key; CBC for
//! file pages. No padding is applied: input must already be a whole number
//! of blocks.

use aes::{Aes128, Aes192, Aes256};
use blowfish::Blowfish;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use des::TdesEde3;

use crate::cipher::registry::{CipherFamily, CipherSpec};
use crate::error::{Error, Result};

/// Largest supported block size.
const MAX_BLOCK: usize = 16;

enum Keyed {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
    Blowfish(Box<Blowfish>),
    Des3(TdesEde3),
}

macro_rules! with_cipher {
    ($keyed:expr, $c:ident => $body:expr) => {
        match $keyed {
            Keyed::Aes128($c) => $body,
            Keyed::Aes192($c) => $body,
            Keyed::Aes256($c) => $body,
            Keyed::Blowfish(boxed) => {
                let $c = &**boxed;
                $body
            }
            Keyed::Des3($c) => $body,
        }
    };
}

/// A block cipher keyed for one [`CipherSpec`].
///
/// Holds the expanded key schedule only, so one instance serves every page
/// of a file with a different IV per call.
pub struct BlockCipher {
    keyed: Keyed,
    block_size: usize,
}

impl BlockCipher {
    /// Keys a cipher from a prefix of `key_material`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `key_material` is shorter than the cipher's key length.
    pub fn new(spec: CipherSpec, key_material: &[u8]) -> Result<Self> {
        let key = key_material
            .get(..spec.key_bytes())
            .ok_or_else(|| Error::InvalidInput(format!("{spec} needs {} key bytes, got {}", spec.key_bytes(), key_material.len())))?;
        let invalid = |_| Error::InvalidInput(format!("invalid key length for {spec}"));

        let keyed = match (spec.family(), spec.key_bytes()) {
            (CipherFamily::Aes, 16) => Keyed::Aes128(Aes128::new_from_slice(key).map_err(invalid)?),
            (CipherFamily::Aes, 24) => Keyed::Aes192(Aes192::new_from_slice(key).map_err(invalid)?),
            (CipherFamily::Aes, 32) => Keyed::Aes256(Aes256::new_from_slice(key).map_err(invalid)?),
            (CipherFamily::Blowfish, _) => Keyed::Blowfish(Box::new(Blowfish::new_from_slice(key).map_err(invalid)?)),
            (CipherFamily::Des3, _) => Keyed::Des3(TdesEde3::new_from_slice(key).map_err(invalid)?),
            (CipherFamily::Aes, n) => return Err(Error::UnsupportedCipher(format!("aes with a {n}-byte key"))),
        };

        Ok(Self { keyed, block_size: spec.block_size() })
    }

    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn encrypt_ecb(&self, data: &mut [u8]) -> Result<()> {
        self.check_aligned(data)?;
        with_cipher!(&self.keyed, c => ecb_encrypt(c, data));
        Ok(())
    }

    pub fn decrypt_ecb(&self, data: &mut [u8]) -> Result<()> {
        self.check_aligned(data)?;
        with_cipher!(&self.keyed, c => ecb_decrypt(c, data));
        Ok(())
    }

    /// CBC-encrypts `data` in place, using the first block of `iv`.
    pub fn encrypt_cbc(&self, iv: &[u8], data: &mut [u8]) -> Result<()> {
        self.check_aligned(data)?;
        let iv = self.iv_block(iv)?;
        with_cipher!(&self.keyed, c => cbc_encrypt(c, iv, data));
        Ok(())
    }

    /// CBC-decrypts `data` in place, using the first block of `iv`.
    pub fn decrypt_cbc(&self, iv: &[u8], data: &mut [u8]) -> Result<()> {
        self.check_aligned(data)?;
        let iv = self.iv_block(iv)?;
        with_cipher!(&self.keyed, c => cbc_decrypt(c, iv, data));
        Ok(())
    }

    fn check_aligned(&self, data: &[u8]) -> Result<()> {
        if data.len().is_multiple_of(self.block_size) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!("{} bytes is not a multiple of the {}-byte block size", data.len(), self.block_size)))
        }
    }

    fn iv_block<'a>(&self, iv: &'a [u8]) -> Result<&'a [u8]> {
        iv.get(..self.block_size).ok_or_else(|| Error::InvalidInput(format!("IV of {} bytes is shorter than the block size", iv.len())))
    }
}

/// Cipher mode for a [`CipherHandle`].
#[derive(Clone, Copy, Debug)]
pub enum Mode {
    Ecb,
    /// CBC with the given IV; 8-byte-block ciphers use its first half.
    Cbc([u8; MAX_BLOCK]),
}

/// A keyed cipher bound to a mode.
pub struct CipherHandle {
    cipher: BlockCipher,
    mode: Mode,
}

impl CipherHandle {
    pub fn encrypt(&self, data: &mut [u8]) -> Result<()> {
        match &self.mode {
            Mode::Ecb => self.cipher.encrypt_ecb(data),
            Mode::Cbc(iv) => self.cipher.encrypt_cbc(iv, data),
        }
    }

    pub fn decrypt(&self, data: &mut [u8]) -> Result<()> {
        match &self.mode {
            Mode::Ecb => self.cipher.decrypt_ecb(data),
            Mode::Cbc(iv) => self.cipher.decrypt_cbc(iv, data),
        }
    }

    #[inline]
    pub const fn block_size(&self) -> usize {
        self.cipher.block_size()
    }
}

/// Builds a keyed cipher in the requested mode.
///
/// `key_material` is normally the session key; only its first
/// `spec.key_bytes()` bytes are used.
pub fn instantiate(spec: CipherSpec, key_material: &[u8], mode: Mode) -> Result<CipherHandle> {
    Ok(CipherHandle { cipher: BlockCipher::new(spec, key_material)?, mode })
}

fn ecb_encrypt<C: BlockEncrypt>(cipher: &C, data: &mut [u8]) {
    for block in data.chunks_exact_mut(C::block_size()) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
}

fn ecb_decrypt<C: BlockDecrypt>(cipher: &C, data: &mut [u8]) {
    for block in data.chunks_exact_mut(C::block_size()) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
}

fn cbc_encrypt<C: BlockEncrypt>(cipher: &C, iv: &[u8], data: &mut [u8]) {
    let bs = C::block_size();
    let mut prev = [0u8; MAX_BLOCK];
    prev[..bs].copy_from_slice(iv);

    for block in data.chunks_exact_mut(bs) {
        block.iter_mut().zip(&prev[..bs]).for_each(|(b, p)| *b ^= p);
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
        prev[..bs].copy_from_slice(block);
    }
}

fn cbc_decrypt<C: BlockDecrypt>(cipher: &C, iv: &[u8], data: &mut [u8]) {
    let bs = C::block_size();
    let mut prev = [0u8; MAX_BLOCK];
    let mut saved = [0u8; MAX_BLOCK];
    prev[..bs].copy_from_slice(iv);

    for block in data.chunks_exact_mut(bs) {
        saved[..bs].copy_from_slice(block);
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
        block.iter_mut().zip(&prev[..bs]).for_each(|(b, p)| *b ^= p);
        prev[..bs].copy_from_slice(&saved[..bs]);
    }
}

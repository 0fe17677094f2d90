//! # Cryptographic Primitives
//!
//! Key derivation, the cipher registry and keyed block ciphers shared by the
//! file and filename codecs.
//!
//! ## Layout
//!
//! - [`derive`]: passphrase + salt to session key and signature
//! - [`registry`]: wire codes to (family, key length) and back
//! - [`block`]: keyed ciphers in ECB and CBC mode
//! - [`hash`]: MD5 root IV and per-page IVs

use rand::TryRng;
use rand::rngs::SysRng;

use crate::error::{Error, Result};

pub mod block;
pub mod derive;
pub mod hash;
pub mod registry;

pub use block::{BlockCipher, CipherHandle, Mode, instantiate};
pub use derive::{derive_session_key, derive_signature};
pub use registry::{CipherFamily, CipherSpec, cipher_for_wire_code, wire_code_for};

/// Fills `buf` from the operating system's secure random source.
pub fn random_bytes(buf: &mut [u8]) -> Result<()> {
    SysRng.try_fill_bytes(buf).map_err(|e| Error::Random(e.to_string()))
}

//! ecryptfs-rs - userspace access to eCryptfs-encrypted files and filenames.
//!
//! Reads what the kernel filesystem writes, without mounting it:
//! - SHA-512 passphrase derivation of the session key and signature
//! - a table-driven cipher registry (AES, Blowfish, triple-DES)
//! - file headers, content-key unwrap and per-page CBC decryption
//! - `ECRYPTFS_FNEK_ENCRYPTED.` filename encryption and decryption
//!
//! ```no_run
//! use ecryptfs_rs::{CipherFamily, CipherSpec, Credentials, EncryptedFile, Salt};
//!
//! # fn main() -> ecryptfs_rs::Result<()> {
//! let credentials = Credentials::derive(b"passphrase", Salt::DEFAULT);
//! let spec = CipherSpec::new(CipherFamily::Aes, 16)?;
//! let mut file = EncryptedFile::open(std::fs::File::open("secret.raw")?, &credentials, spec)?;
//! let plaintext = file.read_all()?;
//! # Ok(())
//! # }
//! ```

pub mod cipher;
pub mod config;
pub mod encoding;
pub mod error;
pub mod file;
pub mod filename;
pub mod header;
pub mod packet;
pub mod secret;
pub mod types;
pub mod worker;

pub use cipher::{CipherFamily, CipherSpec};
pub use error::{Error, Result};
pub use file::{EncryptedFile, encrypt_file};
pub use filename::{FilenameCodec, check_component, is_encrypted};
pub use header::FileHeader;
pub use secret::{SecretBytes, SessionKey};
pub use types::{Credentials, Salt, Signature};

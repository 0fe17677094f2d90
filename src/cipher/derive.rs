//! # Passphrase Key Derivation
//!
//! Turns a passphrase and salt into the 64-byte session key and its 8-byte
//! signature, exactly as `ecryptfs-add-passphrase` does before handing the
//! key to the kernel keyring.
//!
//! ## Algorithm
//!
//! 1. `digest = salt || passphrase`
//! 2. `digest = SHA-512(digest)`, repeated 65536 times
//! 3. `signature = SHA-512(digest)[0..8]`
//!
//! Each round depends on the previous one, so a single derivation cannot be
//! parallelized. Independent derivations can; see
//! [`Credentials::derive_batch`](crate::types::Credentials::derive_batch).

use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use crate::config::{HASH_ITERATIONS, SESSION_KEY_SIZE, SIGNATURE_SIZE};
use crate::secret::SessionKey;
use crate::types::{Salt, Signature};

/// Derives the session key from a passphrase and salt.
///
/// # Arguments
/// * `passphrase` - Raw passphrase bytes, any length (including empty)
/// * `salt` - The 8-byte salt
///
/// # Returns
/// The 64-byte session key. Deterministic for a given input pair.
pub fn derive_session_key(passphrase: &[u8], salt: &Salt) -> SessionKey {
    let mut digest = Sha512::new().chain_update(salt.as_bytes()).chain_update(passphrase).finalize();

    for _ in 1..HASH_ITERATIONS {
        digest = Sha512::digest(digest);
    }

    let mut key = [0u8; SESSION_KEY_SIZE];
    key.copy_from_slice(&digest);
    digest.as_mut_slice().zeroize();

    SessionKey::new(key)
}

/// Computes the signature that identifies a session key.
///
/// The signature is public: it is embedded in every file header and filename
/// packet so a decryptor can tell whether it holds matching credentials.
pub fn derive_signature(session_key: &SessionKey) -> Signature {
    let digest = Sha512::digest(session_key.expose_secret());
    let mut signature = [0u8; SIGNATURE_SIZE];
    signature.copy_from_slice(&digest[..SIGNATURE_SIZE]);
    Signature::new(signature)
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::types::Credentials;

    const PASSWORD_SESSION_KEY: &[u8; SESSION_KEY_SIZE] = b"m\x161\x12\xbb_\xa3\xa4\x99\x02T\x8e\xd6\xdcS*{:]k7\x1e+7+\xa4\xa8\x98\xf9)\x10\xd6!\xab\xe1G[\x1d\xf1Uq\xd24V\xf3c\xed\xaf\xc6\xaf\x96N\x9e\x96y\xe3\x92\xe9\xcc>\x9aD\x9fq";

    static PASSWORD_KEY: LazyLock<SessionKey> = LazyLock::new(|| derive_session_key(b"Password", &Salt::DEFAULT));

    #[test]
    fn test_session_key_vector() {
        assert_eq!(PASSWORD_KEY.expose_secret(), PASSWORD_SESSION_KEY);
    }

    #[test]
    fn test_signature_vectors() {
        assert_eq!(derive_signature(&PASSWORD_KEY).to_string(), "326bd307c877876f");

        let test_key = derive_session_key(b"Test", &Salt::DEFAULT);
        assert_eq!(derive_signature(&test_key).to_string(), "3515cca9baaea1f4");
    }

    #[test]
    fn test_deterministic() {
        let again = derive_session_key(b"Password", &Salt::DEFAULT);
        assert_eq!(again.expose_secret(), PASSWORD_KEY.expose_secret());
        assert_eq!(derive_signature(&again), derive_signature(&PASSWORD_KEY));
    }

    #[test]
    fn test_salt_changes_key() {
        let other = derive_session_key(b"Password", &Salt::new([0; 8]));
        assert_ne!(other.expose_secret(), PASSWORD_KEY.expose_secret());
    }

    #[test]
    fn test_empty_passphrase() {
        let key = derive_session_key(b"", &Salt::DEFAULT);
        assert_ne!(key.expose_secret(), &[0u8; SESSION_KEY_SIZE]);
    }

    #[test]
    fn test_derive_batch_preserves_order() {
        let batch = Credentials::derive_batch(&["Test", "Password"], Salt::DEFAULT);
        let sigs: Vec<String> = batch.iter().map(|c| c.signature().to_string()).collect();
        assert_eq!(sigs, ["3515cca9baaea1f4", "326bd307c877876f"]);
        assert_eq!(batch[1].session_key().expose_secret(), PASSWORD_SESSION_KEY);
    }
}

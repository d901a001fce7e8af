//! PBKDF2-HMAC-SHA256 key derivation.
//!
//! The parameters are part of the envelope contract: any implementation that
//! derives with a different iteration count or hash cannot open envelopes that
//! are already persisted.

use common::envelope::{KDF_ITERATIONS, SALT_LEN};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::CryptoError;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Derived key buffer, wiped on drop.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// Derive the 256-bit envelope key for `passphrase` and `salt`.
///
/// Deterministic for a fixed pair, so decryption can re-derive the encryption
/// key from the salt stored in the envelope. Deliberately slow; call it from a
/// blocking context when running on an async executor.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyMaterial`] if `passphrase` is empty or
/// `salt` is not exactly [`SALT_LEN`] bytes.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Result<DerivedKey, CryptoError> {
    if passphrase.is_empty() || salt.len() != SALT_LEN {
        return Err(CryptoError::InvalidKeyMaterial);
    }
    Ok(pbkdf2_sha256(passphrase.as_bytes(), salt, KDF_ITERATIONS))
}

fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> DerivedKey {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key[..]);
    key
}

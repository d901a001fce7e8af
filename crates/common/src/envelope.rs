//! Wire representation of an encryption envelope.
//!
//! An [`Envelope`] is the only form in which a protected value is ever
//! persisted or transmitted. It is self-describing: the ciphertext, the nonce,
//! the KDF salt and the algorithm parameters travel together, so decryption
//! needs nothing but the envelope and the passphrase.
//!
//! ```text
//! {
//!   "ciphertext": "<base64>",
//!   "iv":         "<base64, 12 raw bytes>",
//!   "salt":       "<base64, 16 raw bytes>",
//!   "alg":        "AES-GCM",
//!   "kdf":        "PBKDF2",
//!   "iterations": 120000,
//!   "hash":       "SHA-256"
//! }
//! ```
//!
//! Binary fields use the standard base64 alphabet with padding.

use serde::{Deserialize, Serialize};

/// Authenticated-encryption algorithm identifier.
pub const ALG_AES_GCM: &str = "AES-GCM";

/// Key-derivation function identifier.
pub const KDF_PBKDF2: &str = "PBKDF2";

/// Hash function used inside the KDF.
pub const HASH_SHA256: &str = "SHA-256";

/// PBKDF2 work factor. Changing this breaks every envelope already persisted.
pub const KDF_ITERATIONS: u32 = 120_000;

/// Raw length of the AES-GCM nonce.
pub const IV_LEN: usize = 12;

/// Raw length of the per-envelope KDF salt.
pub const SALT_LEN: usize = 16;

/// A self-contained encrypted value.
///
/// Every field falls back to its default when absent so that a structurally
/// broken envelope still deserializes as part of its record; it is then
/// rejected at decryption time instead of poisoning the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    /// AES-GCM output (ciphertext followed by the 16-byte tag), base64.
    pub ciphertext: String,
    /// Nonce, base64.
    pub iv: String,
    /// KDF salt, base64.
    pub salt: String,
    /// Must equal [`ALG_AES_GCM`].
    pub alg: String,
    /// Must equal [`KDF_PBKDF2`].
    pub kdf: String,
    /// Must equal [`KDF_ITERATIONS`].
    pub iterations: u32,
    /// Must equal [`HASH_SHA256`].
    pub hash: String,
}

impl Envelope {
    /// Returns `true` if the algorithm tags match this version of the format.
    ///
    /// Anything else is unsupported; there is no best-effort interpretation.
    pub fn has_contract_parameters(&self) -> bool {
        self.alg == ALG_AES_GCM
            && self.kdf == KDF_PBKDF2
            && self.iterations == KDF_ITERATIONS
            && self.hash == HASH_SHA256
    }
}

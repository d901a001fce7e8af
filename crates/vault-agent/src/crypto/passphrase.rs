//! [`Passphrase`]: redacting, zeroizing holder for user passphrases.

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::CryptoError;

/// A non-empty user passphrase.
///
/// Cloning is cheap (shared `Arc`), so per-record rotation tasks can each hold
/// one. The backing string is wiped when the last clone is dropped.
#[derive(Clone)]
pub struct Passphrase(Arc<Zeroizing<String>>);

impl Passphrase {
    /// Wrap `value`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if `value` is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, CryptoError> {
        let value = Zeroizing::new(value.into());
        if value.is_empty() {
            return Err(CryptoError::InvalidKeyMaterial);
        }
        Ok(Self(Arc::new(value)))
    }

    /// Borrow the raw passphrase. Keep the borrow short and never log it.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Returns `true` if both hold the same passphrase.
    pub fn same_as(&self, other: &Passphrase) -> bool {
        self.expose() == other.expose()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the passphrase, not even in debug builds.
        f.write_str("Passphrase([REDACTED])")
    }
}

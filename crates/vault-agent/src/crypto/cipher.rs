//! AES-256-GCM sealing of JSON-serialisable values into [`Envelope`]s.
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce and a fresh 128-bit
//! salt from the OS CSPRNG, so the key itself is unique per envelope and two
//! encryptions of the same value never share ciphertext, nonce or salt.
//!
//! **Never reuse an envelope's iv or salt when re-encrypting.** GCM nonce
//! reuse under one key breaks both confidentiality and authentication.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::envelope::{
    Envelope, ALG_AES_GCM, HASH_SHA256, IV_LEN, KDF_ITERATIONS, KDF_PBKDF2, SALT_LEN,
};
use serde::{de::DeserializeOwned, Serialize};
use zeroize::Zeroizing;

use super::kdf::derive_key;
use super::CryptoError;

/// Seal `value` under `passphrase`.
///
/// The value is serialised to JSON bytes, encrypted with a key derived from
/// the passphrase and a fresh salt, and returned with the contract algorithm
/// tags filled in.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyMaterial`] if `passphrase` is empty,
/// [`CryptoError::Serialization`] if `value` cannot be serialised, and
/// [`CryptoError::EncryptionFailed`] on an internal AEAD error (unreachable
/// with a valid key and nonce).
pub fn encrypt<T: Serialize + ?Sized>(
    value: &T,
    passphrase: &str,
) -> Result<Envelope, CryptoError> {
    if passphrase.is_empty() {
        return Err(CryptoError::InvalidKeyMaterial);
    }
    let plaintext =
        Zeroizing::new(serde_json::to_vec(value).map_err(|_| CryptoError::Serialization)?);

    use aes_gcm::aead::rand_core::RngCore;
    let mut iv = [0u8; IV_LEN];
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut iv);
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::InvalidKeyMaterial)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_slice())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(Envelope {
        ciphertext: STANDARD.encode(ciphertext),
        iv: STANDARD.encode(iv),
        salt: STANDARD.encode(salt),
        alg: ALG_AES_GCM.to_owned(),
        kdf: KDF_PBKDF2.to_owned(),
        iterations: KDF_ITERATIONS,
        hash: HASH_SHA256.to_owned(),
    })
}

/// Open `envelope` with `passphrase` and deserialise the recovered value.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyMaterial`] if `passphrase` is empty.
/// Returns [`CryptoError::DecryptionFailed`] for a wrong passphrase, a
/// tampered envelope, a malformed envelope, unsupported algorithm parameters,
/// or plaintext that does not deserialise into `T`. The cases are
/// indistinguishable to the caller.
pub fn decrypt<T: DeserializeOwned>(
    envelope: &Envelope,
    passphrase: &str,
) -> Result<T, CryptoError> {
    if passphrase.is_empty() {
        return Err(CryptoError::InvalidKeyMaterial);
    }
    let plaintext = open(envelope, passphrase).ok_or(CryptoError::DecryptionFailed)?;
    serde_json::from_slice(&plaintext).map_err(|_| CryptoError::DecryptionFailed)
}

/// Authenticate and decrypt; `None` on any failure.
fn open(envelope: &Envelope, passphrase: &str) -> Option<Zeroizing<Vec<u8>>> {
    if !envelope.has_contract_parameters() {
        return None;
    }
    let iv = STANDARD.decode(&envelope.iv).ok()?;
    let salt = STANDARD.decode(&envelope.salt).ok()?;
    let ciphertext = STANDARD.decode(&envelope.ciphertext).ok()?;
    if iv.len() != IV_LEN || salt.len() != SALT_LEN {
        return None;
    }

    let key = derive_key(passphrase, &salt).ok()?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).ok()?;
    cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
        .ok()
        .map(Zeroizing::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Spending {
        amount_cents: i64,
        merchant: String,
        tags: Vec<String>,
    }

    fn flip_first_byte(b64: &str) -> String {
        let mut raw = STANDARD.decode(b64).unwrap();
        raw[0] ^= 0xFF;
        STANDARD.encode(raw)
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let value = Spending {
            amount_cents: 4_250,
            merchant: "Corner Grocer".into(),
            tags: vec!["food".into(), "weekly".into()],
        };
        let env = encrypt(&value, "correct horse").unwrap();
        let back: Spending = decrypt(&env, "correct horse").unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn round_trip_arbitrary_json() {
        for value in [json!(null), json!(42), json!("note"), json!({"a": [1, {"b": false}]})] {
            let env = encrypt(&value, "p").unwrap();
            let back: serde_json::Value = decrypt(&env, "p").unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn envelope_carries_contract_parameters() {
        let env = encrypt(&json!({"x": 1}), "p").unwrap();
        assert_eq!(env.alg, "AES-GCM");
        assert_eq!(env.kdf, "PBKDF2");
        assert_eq!(env.iterations, 120_000);
        assert_eq!(env.hash, "SHA-256");
        assert_eq!(STANDARD.decode(&env.iv).unwrap().len(), IV_LEN);
        assert_eq!(STANDARD.decode(&env.salt).unwrap().len(), SALT_LEN);
    }

    #[test]
    fn encryption_is_not_deterministic() {
        let a = encrypt(&json!("same"), "p").unwrap();
        let b = encrypt(&json!("same"), "p").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_passphrase_fails_decryption() {
        let env = encrypt(&json!("secret"), "p1").unwrap();
        assert!(matches!(
            decrypt::<serde_json::Value>(&env, "p2"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let mut env = encrypt(&json!("tamper me"), "p").unwrap();
        env.ciphertext = flip_first_byte(&env.ciphertext);
        assert!(matches!(
            decrypt::<serde_json::Value>(&env, "p"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn tampered_iv_fails_auth() {
        let mut env = encrypt(&json!("tamper me"), "p").unwrap();
        env.iv = flip_first_byte(&env.iv);
        assert!(matches!(
            decrypt::<serde_json::Value>(&env, "p"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn unsupported_parameters_are_rejected() {
        let good = encrypt(&json!(1), "p").unwrap();
        let variants = [
            Envelope { alg: "AES-CBC".into(), ..good.clone() },
            Envelope { kdf: "scrypt".into(), ..good.clone() },
            Envelope { iterations: 1, ..good.clone() },
            Envelope { hash: "SHA-512".into(), ..good.clone() },
        ];
        for env in variants {
            assert!(matches!(
                decrypt::<serde_json::Value>(&env, "p"),
                Err(CryptoError::DecryptionFailed)
            ));
        }
    }

    #[test]
    fn malformed_structure_is_rejected() {
        let good = encrypt(&json!(1), "p").unwrap();
        let short_iv = Envelope { iv: STANDARD.encode([0u8; 8]), ..good.clone() };
        let short_salt = Envelope { salt: STANDARD.encode([0u8; 4]), ..good.clone() };
        let bad_b64 = Envelope { ciphertext: "!!!".into(), ..good.clone() };
        let empty = Envelope::default();
        for env in [short_iv, short_salt, bad_b64, empty] {
            assert!(matches!(
                decrypt::<serde_json::Value>(&env, "p"),
                Err(CryptoError::DecryptionFailed)
            ));
        }
    }

    #[test]
    fn mismatched_target_type_is_a_decryption_failure() {
        let env = encrypt(&json!("just a string"), "p").unwrap();
        assert!(matches!(
            decrypt::<Spending>(&env, "p"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn empty_passphrase_is_invalid_key_material() {
        assert!(matches!(encrypt(&json!(1), ""), Err(CryptoError::InvalidKeyMaterial)));
        let env = encrypt(&json!(1), "p").unwrap();
        assert!(matches!(
            decrypt::<serde_json::Value>(&env, ""),
            Err(CryptoError::InvalidKeyMaterial)
        ));
    }
}

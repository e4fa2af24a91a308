//! AES-256-GCM sealing using the `ring` crate.
//!
//! Each call to [`encrypt`] draws a fresh random 96-bit nonce; the nonce is
//! stored next to the ciphertext and handed back to [`decrypt`]. The GCM tag
//! is appended to the ciphertext by `ring`.

use ring::aead::{self, Aad, BoundKey, NONCE_LEN, Nonce, NonceSequence, SealingKey, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{Result, VaultError};

/// Length of the AES-256-GCM key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the AES-256-GCM nonce in bytes (96 bits).
pub const NONCE_LEN_BYTES: usize = NONCE_LEN;

static AEAD_ALG: &aead::Algorithm = &aead::AES_256_GCM;

/// Yields exactly one nonce, then errors. Keeps each sealing key single-use.
struct SingleNonce(Option<[u8; NONCE_LEN_BYTES]>);

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

fn check_key_len(key: &[u8]) -> std::result::Result<(), String> {
    if key.len() == KEY_LEN {
        Ok(())
    } else {
        Err(format!("key must be {KEY_LEN} bytes, got {}", key.len()))
    }
}

/// Encrypt `plaintext` under `key`, returning `(nonce, ciphertext || tag)`.
///
/// # Errors
///
/// Returns [`VaultError::EncryptionFailed`] if the key length is wrong or
/// `ring` reports a failure.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<([u8; NONCE_LEN_BYTES], Vec<u8>)> {
    check_key_len(key).map_err(|reason| VaultError::EncryptionFailed { reason })?;

    let mut nonce_bytes = [0u8; NONCE_LEN_BYTES];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| VaultError::EncryptionFailed {
            reason: "failed to generate random nonce".into(),
        })?;

    let unbound = UnboundKey::new(AEAD_ALG, key).map_err(|_| VaultError::EncryptionFailed {
        reason: "failed to create AES-256-GCM key".into(),
    })?;
    let mut sealing_key = SealingKey::new(unbound, SingleNonce(Some(nonce_bytes)));

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::EncryptionFailed {
            reason: "seal_in_place failed".into(),
        })?;

    Ok((nonce_bytes, in_out))
}

/// Decrypt `ciphertext` (tag included) sealed with `nonce` under `key`.
///
/// # Errors
///
/// Returns [`VaultError::DecryptionFailed`] if the key is wrong or the
/// ciphertext was tampered with.
pub fn decrypt(nonce: &[u8; NONCE_LEN_BYTES], ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    check_key_len(key).map_err(|reason| VaultError::DecryptionFailed { reason })?;

    let unbound = UnboundKey::new(AEAD_ALG, key).map_err(|_| VaultError::DecryptionFailed {
        reason: "failed to create AES-256-GCM key".into(),
    })?;
    let mut opening_key = aead::OpeningKey::new(unbound, SingleNonce(Some(*nonce)));

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening_key
        .open_in_place(Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::DecryptionFailed {
            reason: "authentication failed, wrong key or corrupted data".into(),
        })?;

    Ok(plaintext.to_vec())
}

/// Generate `len` cryptographically secure random bytes.
///
/// # Errors
///
/// Returns [`VaultError::Internal`] if the system CSPRNG fails.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| VaultError::Internal("failed to generate random bytes".into()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_and_open() {
        let key = random_bytes(KEY_LEN).unwrap();
        let plaintext = br#"{"access_token":"ya29.a0"}"#;

        let (nonce, ciphertext) = encrypt(plaintext, &key).unwrap();
        assert_ne!(&ciphertext[..plaintext.len()], plaintext.as_slice());

        let opened = decrypt(&nonce, &ciphertext, &key).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let key = random_bytes(KEY_LEN).unwrap();
        let other = random_bytes(KEY_LEN).unwrap();

        let (nonce, ciphertext) = encrypt(b"refresh", &key).unwrap();
        assert!(matches!(
            decrypt(&nonce, &ciphertext, &other),
            Err(VaultError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = random_bytes(KEY_LEN).unwrap();
        let (nonce, mut ciphertext) = encrypt(b"secret", &key).unwrap();
        ciphertext[0] ^= 0x01;

        assert!(decrypt(&nonce, &ciphertext, &key).is_err());
    }

    #[test]
    fn short_key_is_rejected() {
        let result = encrypt(b"test", &[0u8; 16]);
        assert!(matches!(result, Err(VaultError::EncryptionFailed { .. })));
    }

    #[test]
    fn nonces_differ_per_call() {
        let key = random_bytes(KEY_LEN).unwrap();
        let (n1, _) = encrypt(b"same", &key).unwrap();
        let (n2, _) = encrypt(b"same", &key).unwrap();
        assert_ne!(n1, n2);
    }
}

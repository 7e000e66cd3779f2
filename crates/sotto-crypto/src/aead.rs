//! Authenticated encryption using AES-256-GCM
//!
//! Encryption takes an explicit IV so tests stay deterministic; production
//! call sites pair every encrypt with a fresh [`random_iv`]. Reusing an IV
//! under the same key is a fatal invariant violation (both confidentiality
//! and authenticity break), so the IV never has a default.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};

use crate::{error::CryptoError, keys::SymmetricKey};

/// GCM initialization vector size (96 bits)
pub const IV_SIZE: usize = 12;

/// GCM authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Generate a fresh random 96-bit IV from the system RNG.
pub fn random_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt a plaintext under a symmetric key.
///
/// Returns the ciphertext with the 16-byte GCM tag appended. The IV is not
/// secret and travels alongside the ciphertext; it MUST be fresh per call.
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey, iv: [u8; IV_SIZE]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    #[allow(deprecated)]
    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&iv), plaintext) else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };

    ciphertext
}

/// Decrypt a ciphertext under a symmetric key.
///
/// All-or-nothing: tag verification is mandatory and a failed tag returns
/// no plaintext at all.
///
/// # Errors
///
/// - `InvalidIvLength` if the IV is not 96 bits
/// - `DecryptionFailed` on tag mismatch (wrong key or tampered data)
pub fn decrypt(ciphertext: &[u8], iv: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != IV_SIZE {
        return Err(CryptoError::InvalidIvLength { expected: IV_SIZE, actual: iv.len() });
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    #[allow(deprecated)]
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

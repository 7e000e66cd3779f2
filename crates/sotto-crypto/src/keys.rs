//! Key handles and portable encodings
//!
//! Public keys travel as SPKI DER, private keys as PKCS#8 DER, symmetric
//! keys as raw 32-byte strings. These are the only encodings that cross the
//! directory, signaling, and backup channels.

use p256::{
    PublicKey, SecretKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
};
use rand::{RngCore, rngs::OsRng};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Symmetric key size in bytes (AES-256)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// A 256-bit symmetric key handle.
///
/// Used for pairwise session keys, group sender keys, and password-derived
/// backup keys. Key material is zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    /// The 32-byte key for AES-256-GCM
    bytes: [u8; SYMMETRIC_KEY_SIZE],
}

impl SymmetricKey {
    /// Generate a fresh random key from the system RNG
    /// (used for group sender keys).
    pub fn generate() -> Self {
        let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Wrap raw key material.
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Import a key from its portable raw encoding.
    ///
    /// # Errors
    ///
    /// `InvalidKeyLength` if the slice is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SYMMETRIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyLength { expected: SYMMETRIC_KEY_SIZE, actual: bytes.len() }
        })?;
        Ok(Self { bytes })
    }

    /// The raw 32-byte key.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.bytes
    }

    /// Export the key in its portable raw encoding.
    pub fn export_raw(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    // Never print key material
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// A long-lived ECDH P-256 identity key pair.
///
/// One pair per user per device, generated once and persisted for the life
/// of the account. The private half leaves the device only through
/// [`export_private`](Self::export_private), which exists for device-sync
/// transfer and password-protected backup.
pub struct IdentityKeyPair {
    secret: SecretKey,
}

impl IdentityKeyPair {
    /// Generate a fresh P-256 key pair from the system RNG.
    pub fn generate() -> Self {
        Self { secret: SecretKey::random(&mut OsRng) }
    }

    /// Import a key pair from a PKCS#8 DER private key
    /// (the public half is recomputed from the private scalar).
    ///
    /// # Errors
    ///
    /// `KeyEncoding` if the bytes are not a valid P-256 PKCS#8 document.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CryptoError> {
        let secret =
            SecretKey::from_pkcs8_der(der).map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Ok(Self { secret })
    }

    /// The private half, for key agreement.
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// The public half.
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Export the public half as SPKI DER for publication to the directory.
    pub fn export_public(&self) -> Result<Vec<u8>, CryptoError> {
        public_key_to_spki(&self.public_key())
    }

    /// Export the private half as PKCS#8 DER.
    ///
    /// # Security
    ///
    /// This makes identity private keys extractable, a deliberate trade-off:
    /// device-to-device transfer and backup both require the raw key to
    /// leave the process. Callers must only ship the result over a channel
    /// that is itself encrypted (ephemeral ECDH for sync, password-derived
    /// key for backup).
    pub fn export_private(&self) -> Result<Vec<u8>, CryptoError> {
        let doc =
            self.secret.to_pkcs8_der().map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdentityKeyPair(..)")
    }
}

/// Decode a public key from SPKI DER (the directory wire form).
///
/// # Errors
///
/// `KeyEncoding` if the bytes are not a valid P-256 SPKI document.
pub fn public_key_from_spki(der: &[u8]) -> Result<PublicKey, CryptoError> {
    PublicKey::from_public_key_der(der).map_err(|e| CryptoError::KeyEncoding(e.to_string()))
}

/// Encode a public key as SPKI DER (the directory wire form).
pub fn public_key_to_spki(public: &PublicKey) -> Result<Vec<u8>, CryptoError> {
    let doc = public.to_public_key_der().map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
    Ok(doc.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_key_roundtrip_through_raw_encoding() {
        let key = SymmetricKey::from_bytes([0x42; SYMMETRIC_KEY_SIZE]);
        let raw = key.export_raw();
        let restored = SymmetricKey::from_slice(&raw).unwrap();
        assert_eq!(key, restored);
    }

    #[test]
    fn symmetric_key_rejects_wrong_length() {
        let result = SymmetricKey::from_slice(&[0u8; 16]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 16 })
        ));
    }

    #[test]
    fn identity_pair_roundtrip_through_pkcs8() {
        let pair = IdentityKeyPair::generate();
        let der = pair.export_private().unwrap();

        let restored = IdentityKeyPair::from_pkcs8_der(&der).unwrap();
        assert_eq!(pair.public_key(), restored.public_key());
    }

    #[test]
    fn public_key_roundtrip_through_spki() {
        let pair = IdentityKeyPair::generate();
        let spki = pair.export_public().unwrap();

        let restored = public_key_from_spki(&spki).unwrap();
        assert_eq!(pair.public_key(), restored);
    }

    #[test]
    fn import_rejects_garbage_pkcs8() {
        assert!(matches!(
            IdentityKeyPair::from_pkcs8_der(b"not a key"),
            Err(CryptoError::KeyEncoding(_))
        ));
    }

    #[test]
    fn import_rejects_garbage_spki() {
        assert!(matches!(public_key_from_spki(&[0xFF; 40]), Err(CryptoError::KeyEncoding(_))));
    }

    #[test]
    fn generated_pairs_are_distinct() {
        let a = IdentityKeyPair::generate();
        let b = IdentityKeyPair::generate();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn debug_never_prints_key_material() {
        let key = SymmetricKey::from_bytes([0xAB; SYMMETRIC_KEY_SIZE]);
        assert_eq!(format!("{key:?}"), "SymmetricKey(..)");

        let pair = IdentityKeyPair::generate();
        assert_eq!(format!("{pair:?}"), "IdentityKeyPair(..)");
    }
}

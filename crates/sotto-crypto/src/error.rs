//! Error types for primitive operations

use thiserror::Error;

/// Errors from cryptographic primitives.
///
/// Every variant is fatal to the one operation that raised it. Primitives
/// never produce partial output: a failed decrypt returns no plaintext, a
/// failed import returns no key handle.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Authentication tag verification failed during AEAD decryption.
    ///
    /// Covers both a wrong key and a tampered ciphertext; GCM cannot
    /// distinguish the two and callers must not try to.
    #[error("decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// Symmetric key material has the wrong length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Initialization vector has the wrong length
    #[error("invalid IV length: expected {expected}, got {actual}")]
    InvalidIvLength {
        /// Expected IV length in bytes
        expected: usize,
        /// Actual IV length in bytes
        actual: usize,
    },

    /// Failed to encode or decode a key in its portable form
    /// (SPKI for public keys, PKCS#8 for private keys)
    #[error("key encoding error: {0}")]
    KeyEncoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CryptoError::InvalidKeyLength { expected: 32, actual: 16 };
        assert_eq!(err.to_string(), "invalid key length: expected 32, got 16");

        let err = CryptoError::DecryptionFailed;
        assert_eq!(err.to_string(), "decryption failed: authentication tag mismatch");
    }
}

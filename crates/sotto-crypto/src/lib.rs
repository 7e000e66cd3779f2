//! Sotto Cryptographic Primitives
//!
//! Cryptographic building blocks for the Sotto E2EE engine. Pure functions
//! with no I/O and no engine state. Randomness is explicit: encryption takes
//! a caller-supplied IV and password derivation takes a caller-supplied salt,
//! with [`random_iv`] and [`random_salt`] as the production sources. This
//! keeps every primitive deterministic under test.
//!
//! # Key Material
//!
//! ```text
//! Identity Key Pair (ECDH P-256, long-lived)
//!        │
//!        ▼
//! ECDH → Pairwise Session Key (per peer, AES-256)
//!        │
//!        ▼
//! AEAD Encryption → Ciphertext (AES-256-GCM, fresh 96-bit IV)
//!
//! Password ──PBKDF2-HMAC-SHA256──▶ Backup Key (AES-256)
//! ```
//!
//! # Security
//!
//! Key agreement:
//! - `derive_shared_key(a.secret, b.public) == derive_shared_key(b.secret, a.public)`
//!   for all valid pairs. Both parties derive the identical session key with
//!   no network round-trip.
//!
//! Authenticity:
//! - AES-256-GCM provides tamper-proof encryption
//! - Failed authentication tag -> reject ciphertext, no partial output
//! - IV reuse under one key breaks both confidentiality and authenticity;
//!   every encrypt call site must pair with a fresh [`random_iv`]
//!
//! Exportability:
//! - Private keys are exportable (PKCS#8) by design: device-to-device
//!   identity transfer and password-protected backup both require it. This
//!   is a deliberate trade-off against hardware-backed non-extractable keys;
//!   [`IdentityKeyPair::export_private`] is the single place identity key
//!   material leaves the type.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod aead;
mod agreement;
mod error;
mod keys;
mod password;

pub use aead::{IV_SIZE, TAG_SIZE, decrypt, encrypt, random_iv};
pub use agreement::derive_shared_key;
pub use error::CryptoError;
pub use keys::{
    IdentityKeyPair, SYMMETRIC_KEY_SIZE, SymmetricKey, public_key_from_spki, public_key_to_spki,
};
pub use password::{PBKDF2_ITERATIONS, SALT_SIZE, derive_key_from_password, random_salt};

// Re-exported so callers can hold key handles without naming p256 directly.
pub use p256::{PublicKey, SecretKey};

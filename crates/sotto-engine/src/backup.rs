//! Password-protected identity backup
//!
//! Serializes the identity private key into a self-contained, portable
//! file: no vault state is needed to restore, only the user's backup
//! password. The salt and IV travel inside the file; the password key is
//! re-derived on import.

use serde::{Deserialize, Serialize};
use sotto_crypto::{
    IdentityKeyPair, decrypt, derive_key_from_password, encrypt, random_iv, random_salt,
};

use crate::{error::EngineError, hex_bytes, now_unix};

/// Current backup format version.
pub const BACKUP_VERSION: u32 = 1;

/// Format type tag; unknown tags are rejected before any decryption.
pub const BACKUP_TYPE: &str = "sotto_identity_v1";

/// A portable, password-encrypted identity backup.
///
/// Serialized as a self-describing JSON object with hex-encoded byte
/// fields. Forward-incompatible files are rejected by the `version`/`type`
/// check, never by a decryption attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupFile {
    /// Format version (see [`BACKUP_VERSION`])
    pub version: u32,
    /// Format type tag (see [`BACKUP_TYPE`])
    #[serde(rename = "type")]
    pub kind: String,
    /// Unix timestamp (seconds) of export
    pub timestamp: u64,
    /// PBKDF2 salt
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
    /// AES-GCM IV
    #[serde(with = "hex_bytes")]
    pub iv: Vec<u8>,
    /// Encrypted identity private key (PKCS#8 DER)
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
}

impl BackupFile {
    /// Encode for file export.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode an imported file.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Export the identity private key under a backup password.
///
/// Fresh salt and IV per export: two backups of the same key with the same
/// password never produce the same file.
pub fn export(identity_pkcs8: &[u8], password: &str) -> BackupFile {
    let salt = random_salt();
    let iv = random_iv();
    let key = derive_key_from_password(password, &salt);

    BackupFile {
        version: BACKUP_VERSION,
        kind: BACKUP_TYPE.to_string(),
        timestamp: now_unix(),
        salt: salt.to_vec(),
        iv: iv.to_vec(),
        ciphertext: encrypt(identity_pkcs8, &key, iv),
    }
}

/// Recover the identity private key from a backup file.
///
/// # Errors
///
/// - `UnsupportedBackupFormat` if the declared version or type is unknown
///   (checked before deriving anything)
/// - `InvalidPasswordOrCorruptFile` on any decryption failure: a wrong
///   password and a corrupted file are indistinguishable by design, and
///   the distinction must not leak
pub fn import(file: &BackupFile, password: &str) -> Result<Vec<u8>, EngineError> {
    if file.version != BACKUP_VERSION || file.kind != BACKUP_TYPE {
        return Err(EngineError::UnsupportedBackupFormat {
            version: file.version,
            kind: file.kind.clone(),
        });
    }

    let key = derive_key_from_password(password, &file.salt);
    let identity_pkcs8 = decrypt(&file.ciphertext, &file.iv, &key)
        .map_err(|_| EngineError::InvalidPasswordOrCorruptFile)?;

    // An authentic payload that is not a parseable private key would poison
    // the identity slot on import; treat it as corruption.
    IdentityKeyPair::from_pkcs8_der(&identity_pkcs8)
        .map_err(|_| EngineError::InvalidPasswordOrCorruptFile)?;

    Ok(identity_pkcs8)
}

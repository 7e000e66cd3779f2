//! Error types for the engine.
//!
//! The taxonomy separates recoverable conditions (a peer who simply has not
//! published a key yet) from fatal ones (a failed authentication tag). The
//! one place errors are swallowed instead of propagated is per-recipient
//! distribution in [`crate::GroupKeyDistributor`]: one bad peer must not
//! block the rest of the group.

use sotto_core::{StoreError, VaultError};
use sotto_crypto::CryptoError;
use thiserror::Error;

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The directory has no published public key for this peer.
    ///
    /// Recoverable: the peer may publish later, retry then.
    #[error("no published key for peer: {peer_id}")]
    PeerKeyUnavailable {
        /// Peer whose key is missing
        peer_id: String,
    },

    /// A session or sender-key operation ran with no local identity.
    ///
    /// The caller must bootstrap an identity (generate, device-sync, or
    /// backup import) before retrying; proceeding silently is forbidden.
    #[error("no local identity key")]
    IdentityMissing,

    /// A device-sync session failed (corrupted or stale channel).
    ///
    /// Fatal to that session only; the user must start a new one.
    #[error("device sync failed: {reason}")]
    SyncFailed {
        /// What broke, for the user-visible report
        reason: String,
    },

    /// Backup import failed: wrong password or corrupted file.
    ///
    /// The two causes are indistinguishable by design (a GCM tag mismatch
    /// looks the same either way) and must not be separated, to avoid
    /// aiding password guessing.
    #[error("invalid password or corrupt backup file")]
    InvalidPasswordOrCorruptFile,

    /// Backup file declares a version or type this build does not read.
    ///
    /// Checked before any decryption is attempted.
    #[error("unsupported backup format: version {version}, type {kind:?}")]
    UnsupportedBackupFormat {
        /// Declared format version
        version: u32,
        /// Declared format type tag
        kind: String,
    },

    /// A primitive operation failed (never partially applied)
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Local vault failure
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Remote collaborator store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Portable-format encode/decode failure (backup file, sync offer)
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl EngineError {
    /// Returns true if retrying later may succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::PeerKeyUnavailable { .. } => true,
            Self::Store(err) => err.is_transient(),
            Self::IdentityMissing
            | Self::SyncFailed { .. }
            | Self::InvalidPasswordOrCorruptFile
            | Self::UnsupportedBackupFormat { .. }
            | Self::Crypto(_)
            | Self::Vault(_)
            | Self::Serialization(_) => false,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

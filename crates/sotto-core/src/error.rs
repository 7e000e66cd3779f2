//! Storage-layer error types.
//!
//! Two families: [`VaultError`] for the local key store and [`StoreError`]
//! for the remote collaborators (directory, mailbox, signaling). Both are
//! I/O-shaped; protocol-level failures live in the engine crate.

use thiserror::Error;

/// Errors from the local secure vault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Underlying store failed (disk, keychain, database)
    #[error("vault I/O error: {0}")]
    Io(String),
}

/// Errors from the remote collaborator stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record that must exist was not found
    #[error("record not found: {id}")]
    NotFound {
        /// Identifier of the missing record
        id: String,
    },

    /// A record that must not exist was already present
    #[error("record already exists: {id}")]
    Conflict {
        /// Identifier of the conflicting record
        id: String,
    },

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Transport or backend failure
    #[error("store I/O error: {0}")]
    Io(String),
}

impl StoreError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Backend failures are typically transient; `NotFound`/`Conflict` are
    /// state disagreements that a retry alone will not fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

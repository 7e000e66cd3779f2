//! Local secure vault for key handles and raw secrets
//!
//! The vault is device-local and process-durable: it survives restarts but
//! is never shared across devices. It is the single mutable shared resource
//! in the engine, so reads and writes must be linearizable per key.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::error::VaultError;

/// Local store for cryptographic key material, keyed by string identifier.
///
/// This trait must be:
/// - `Clone`: one vault is shared by every engine component
/// - `Send + Sync`: thread-safe for concurrent access
/// - Synchronous: vault access is local, never a network hop
///
/// # Clone Semantics
///
/// Implementations share internal state via `Arc`, so clones access the
/// same underlying store.
///
/// # Invariants
///
/// - Per-key linearizability: concurrent operations on the same key must
///   not interleave into a torn or mixed value.
/// - Values are opaque bytes; the vault never interprets key material.
pub trait SecureVault: Clone + Send + Sync + 'static {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, VaultError>;

    /// Store `value` under `key`, overwriting any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), VaultError>;

    /// Remove the value stored under `key`. Removing an absent key is a
    /// no-op, not an error.
    fn delete(&self, key: &str) -> Result<(), VaultError>;

    /// Remove every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed. Used to invalidate a whole
    /// namespace at once (e.g. all cached sessions after an identity
    /// import replaces the private key they were derived from).
    fn delete_prefix(&self, prefix: &str) -> Result<usize, VaultError>;
}

/// Namespaced vault identifiers.
///
/// All cache keys go through these constructors so a version segment can be
/// added later (key rotation) without touching call sites.
pub mod keys {
    /// Identifier for the long-term identity private key (PKCS#8 DER).
    pub fn identity() -> String {
        "identity/private".to_string()
    }

    /// Identifier for the pairwise session key with `peer_id`.
    pub fn session(peer_id: &str) -> String {
        format!("session/{peer_id}")
    }

    /// Prefix covering every cached pairwise session key.
    pub fn session_prefix() -> String {
        "session/".to_string()
    }

    /// Identifier for our own sender key in `group_id`.
    pub fn own_sender(group_id: &str) -> String {
        format!("sender-own/{group_id}")
    }

    /// Identifier for `peer_id`'s sender key in `group_id`.
    pub fn peer_sender(group_id: &str, peer_id: &str) -> String {
        format!("sender-peer/{group_id}/{peer_id}")
    }
}

/// In-memory vault for tests and reference semantics.
///
/// A `Mutex<HashMap>` gives per-key linearizability for free: every
/// operation holds the map lock for its full duration.
#[derive(Clone, Default)]
pub struct MemoryVault {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned lock still holds structurally valid bytes; recover it
        // rather than propagating a panic from an unrelated thread.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SecureVault for MemoryVault {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, VaultError> {
        Ok(self.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), VaultError> {
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), VaultError> {
        self.lock().remove(key);
        Ok(())
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize, VaultError> {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}

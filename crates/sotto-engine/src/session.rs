//! Pairwise session establishment
//!
//! A session key for (A, B) computed by A equals the one computed by B;
//! ECDH symmetry is the load-bearing correctness property of the engine.
//! Sessions are derived lazily on first need, cached in the vault, and
//! never rotated.

use std::{collections::HashMap, sync::Arc};

use sotto_core::{Directory, SecureVault, vault::keys};
use sotto_crypto::{SymmetricKey, derive_shared_key, public_key_from_spki};
use tracing::debug;

use crate::{error::EngineError, identity::IdentityManager};

type PeerLocks = tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Derives and caches pairwise session keys.
pub struct SessionEstablisher<V> {
    vault: V,
    directory: Arc<dyn Directory>,
    identity: Arc<IdentityManager<V>>,
    /// Single-flight locks keyed by peer id. Concurrent derivations for the
    /// same peer would produce mathematically identical keys, so this is an
    /// optimization (one directory fetch, one vault write), not a
    /// correctness requirement.
    peer_locks: PeerLocks,
}

impl<V: SecureVault> SessionEstablisher<V> {
    /// Create an establisher backed by this device's vault and identity.
    pub fn new(vault: V, directory: Arc<dyn Directory>, identity: Arc<IdentityManager<V>>) -> Self {
        Self { vault, directory, identity, peer_locks: tokio::sync::Mutex::new(HashMap::new()) }
    }

    /// Get the cached session key for `peer_id`, establishing one if absent.
    ///
    /// # Errors
    ///
    /// - `IdentityMissing` if this device has no identity yet
    /// - `PeerKeyUnavailable` if the peer has not published a public key
    ///   (recoverable: retry once they have)
    pub async fn session_with(&self, peer_id: &str) -> Result<SymmetricKey, EngineError> {
        if let Some(raw) = self.vault.get(&keys::session(peer_id))? {
            return Ok(SymmetricKey::from_slice(&raw)?);
        }

        let peer_lock = {
            let mut locks = self.peer_locks.lock().await;
            locks.entry(peer_id.to_string()).or_default().clone()
        };
        let _guard = peer_lock.lock().await;

        // Re-check under the lock: a concurrent caller may have cached.
        if let Some(raw) = self.vault.get(&keys::session(peer_id))? {
            return Ok(SymmetricKey::from_slice(&raw)?);
        }

        let pair = self.identity.key_pair()?;
        let spki = self
            .directory
            .public_key(peer_id)
            .await?
            .ok_or_else(|| EngineError::PeerKeyUnavailable { peer_id: peer_id.to_string() })?;
        let peer_public = public_key_from_spki(&spki)?;

        let session = derive_shared_key(pair.secret_key(), &peer_public);
        self.vault.put(&keys::session(peer_id), &session.export_raw())?;

        debug!(peer_id, "established pairwise session");
        Ok(session)
    }
}

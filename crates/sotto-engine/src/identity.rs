//! Long-term identity key lifecycle
//!
//! One ECDH P-256 pair per user per device. The private half lives in the
//! vault and leaves the device only through device sync or backup; the
//! public half is republished to the directory whenever the identity is
//! (re)generated or imported.

use std::sync::Arc;

use sotto_core::{Directory, SecureVault, vault::keys};
use sotto_crypto::IdentityKeyPair;
use tracing::info;

use crate::error::EngineError;

/// Owns the long-term identity key pair.
pub struct IdentityManager<V> {
    user_id: String,
    vault: V,
    directory: Arc<dyn Directory>,
    /// Serializes generation so two concurrent `ensure_identity` calls
    /// cannot both generate (the loser would overwrite the winner's key
    /// and destroy every session derived from it).
    ensure_lock: tokio::sync::Mutex<()>,
}

impl<V: SecureVault> IdentityManager<V> {
    /// Create a manager for `user_id`'s identity on this device.
    pub fn new(user_id: impl Into<String>, vault: V, directory: Arc<dyn Directory>) -> Self {
        Self {
            user_id: user_id.into(),
            vault,
            directory,
            ensure_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The user this identity belongs to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether this device holds an identity private key.
    pub fn has_identity(&self) -> Result<bool, EngineError> {
        Ok(self.vault.get(&keys::identity())?.is_some())
    }

    /// Idempotently ensure an identity exists; returns the public half
    /// (SPKI DER).
    ///
    /// If the vault already holds a private key it is returned as-is;
    /// generation over an existing key is forbidden, since overwriting the
    /// identity destroys the ability to decrypt prior sessions. Otherwise a
    /// fresh pair is generated and the private half stored.
    ///
    /// The public half is (re)published on every call. Publication is
    /// idempotent, and the vault write commits before the directory write,
    /// so a failed publish leaves a stored-but-unpublished identity that
    /// the next call heals.
    pub async fn ensure_identity(&self) -> Result<Vec<u8>, EngineError> {
        if let Some(der) = self.vault.get(&keys::identity())? {
            return self.republish(&der).await;
        }

        let _guard = self.ensure_lock.lock().await;
        // Re-check under the lock: a concurrent call may have generated.
        if let Some(der) = self.vault.get(&keys::identity())? {
            return self.republish(&der).await;
        }

        let pair = IdentityKeyPair::generate();
        let public = pair.export_public()?;
        self.vault.put(&keys::identity(), &pair.export_private()?)?;
        self.directory.set_public_key(&self.user_id, &public).await?;

        info!(user_id = %self.user_id, "generated new identity key pair");
        Ok(public)
    }

    async fn republish(&self, pkcs8: &[u8]) -> Result<Vec<u8>, EngineError> {
        let public = IdentityKeyPair::from_pkcs8_der(pkcs8)?.export_public()?;
        self.directory.set_public_key(&self.user_id, &public).await?;
        Ok(public)
    }

    /// Load the identity key pair from the vault.
    ///
    /// # Errors
    ///
    /// `IdentityMissing` if no identity has been created or imported yet.
    pub fn key_pair(&self) -> Result<IdentityKeyPair, EngineError> {
        let der = self.vault.get(&keys::identity())?.ok_or(EngineError::IdentityMissing)?;
        Ok(IdentityKeyPair::from_pkcs8_der(&der)?)
    }

    /// The identity private key in its portable PKCS#8 form, for device
    /// sync and backup export.
    pub fn identity_pkcs8(&self) -> Result<Vec<u8>, EngineError> {
        self.vault.get(&keys::identity())?.ok_or(EngineError::IdentityMissing)
    }

    /// Install an identity transferred from another device or restored from
    /// backup; returns the public half (SPKI DER).
    ///
    /// All-or-nothing: the bytes are validated before anything is written.
    /// Cached pairwise sessions are cleared (they were derived under
    /// whatever key occupied the identity slot before) and the public half
    /// is republished.
    pub async fn import_identity(&self, pkcs8: &[u8]) -> Result<Vec<u8>, EngineError> {
        let pair = IdentityKeyPair::from_pkcs8_der(pkcs8)?;
        let public = pair.export_public()?;

        let _guard = self.ensure_lock.lock().await;
        self.vault.put(&keys::identity(), pkcs8)?;
        self.vault.delete_prefix(&keys::session_prefix())?;
        self.directory.set_public_key(&self.user_id, &public).await?;

        info!(user_id = %self.user_id, "imported identity key pair");
        Ok(public)
    }
}

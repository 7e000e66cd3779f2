//! Group sender-key distribution
//!
//! Sender-Keys scheme: each group member owns one symmetric sender key and
//! encrypts all of their outgoing group messages under it. The key reaches
//! every other member wrapped under the pairwise session key and dropped in
//! that member's mailbox.
//!
//! Distribution is explicitly triggered (first send, or a manual
//! redistribution); membership changes do not redistribute automatically,
//! so late joiners get forward access only.

use std::sync::Arc;

use sotto_core::{KeyEnvelope, MailboxStore, SecureVault, vault::keys};
use sotto_crypto::{SymmetricKey, decrypt, encrypt, random_iv};
use tracing::{debug, warn};

use crate::{error::EngineError, now_unix, session::SessionEstablisher};

/// Outcome of one distribution pass.
///
/// Partial distribution is acceptable and self-healing: recipients that
/// failed this time (typically `PeerKeyUnavailable`) are simply retried on
/// the next call.
#[derive(Debug, Default)]
pub struct DistributionReport {
    /// Members whose mailbox received our envelope
    pub delivered: Vec<String>,
    /// Members we could not deliver to, with the per-recipient error
    pub failed: Vec<(String, EngineError)>,
}

impl DistributionReport {
    /// True if every targeted member received an envelope.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Manages sender keys for the groups this user participates in.
pub struct GroupKeyDistributor<V> {
    self_id: String,
    vault: V,
    mailbox: Arc<dyn MailboxStore>,
    sessions: Arc<SessionEstablisher<V>>,
    /// Serializes sender-key generation per distributor. The FIRST
    /// generated key must win: messages may already be encrypted under it,
    /// and a silent replacement would make them undecryptable.
    generate_lock: tokio::sync::Mutex<()>,
}

impl<V: SecureVault> GroupKeyDistributor<V> {
    /// Create a distributor acting as `self_id`.
    pub fn new(
        self_id: impl Into<String>,
        vault: V,
        mailbox: Arc<dyn MailboxStore>,
        sessions: Arc<SessionEstablisher<V>>,
    ) -> Self {
        Self {
            self_id: self_id.into(),
            vault,
            mailbox,
            sessions,
            generate_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Get our own sender key for `group_id`, generating it on first use.
    ///
    /// Generation is purely local; no coordination with other members is
    /// needed. Stable for the group's lifetime unless the vault is cleared.
    pub async fn own_sender_key(&self, group_id: &str) -> Result<SymmetricKey, EngineError> {
        if let Some(raw) = self.vault.get(&keys::own_sender(group_id))? {
            return Ok(SymmetricKey::from_slice(&raw)?);
        }

        let _guard = self.generate_lock.lock().await;
        // A concurrent ensure may have generated; it won, return its key.
        if let Some(raw) = self.vault.get(&keys::own_sender(group_id))? {
            return Ok(SymmetricKey::from_slice(&raw)?);
        }

        let key = SymmetricKey::generate();
        self.vault.put(&keys::own_sender(group_id), &key.export_raw())?;

        debug!(group_id, "generated sender key");
        Ok(key)
    }

    /// Distribute our sender key for `group_id` to every member but self.
    ///
    /// For each recipient: establish/reuse the pairwise session, encrypt
    /// the raw sender-key bytes under it with a fresh IV, and merge the
    /// envelope into their mailbox. Safe to call redundantly (overwrites
    /// only our own entry).
    ///
    /// Per-recipient failures are logged and collected in the report; they
    /// never abort delivery to the remaining members.
    pub async fn distribute_own_key(
        &self,
        group_id: &str,
        member_ids: &[String],
    ) -> Result<DistributionReport, EngineError> {
        let key = self.own_sender_key(group_id).await?;
        let mut report = DistributionReport::default();

        for member_id in member_ids {
            if member_id == &self.self_id {
                continue;
            }
            match self.deliver_to(group_id, member_id, &key).await {
                Ok(()) => report.delivered.push(member_id.clone()),
                Err(err) => {
                    warn!(group_id, %member_id, %err, "sender key delivery failed; continuing");
                    report.failed.push((member_id.clone(), err));
                },
            }
        }

        Ok(report)
    }

    /// Resolve `peer_id`'s sender key for `group_id`.
    ///
    /// Checks the local cache, then the envelope the peer addressed to us.
    /// Returns `Ok(None)` when no envelope exists yet: "key not yet
    /// available" is an ordinary condition (render a pending-decryption
    /// placeholder), not an error.
    pub async fn peer_sender_key(
        &self,
        group_id: &str,
        peer_id: &str,
    ) -> Result<Option<SymmetricKey>, EngineError> {
        if let Some(raw) = self.vault.get(&keys::peer_sender(group_id, peer_id))? {
            return Ok(Some(SymmetricKey::from_slice(&raw)?));
        }

        let Some(envelope) = self.mailbox.envelope_from(group_id, &self.self_id, peer_id).await?
        else {
            return Ok(None);
        };

        let session = self.sessions.session_with(peer_id).await?;
        let raw = decrypt(&envelope.ciphertext, &envelope.iv, &session)?;
        let key = SymmetricKey::from_slice(&raw)?;

        self.vault.put(&keys::peer_sender(group_id, peer_id), &raw)?;
        debug!(group_id, peer_id, "resolved peer sender key");
        Ok(Some(key))
    }

    async fn deliver_to(
        &self,
        group_id: &str,
        member_id: &str,
        key: &SymmetricKey,
    ) -> Result<(), EngineError> {
        let session = self.sessions.session_with(member_id).await?;
        let iv = random_iv();
        let ciphertext = encrypt(&key.export_raw(), &session, iv);

        let envelope = KeyEnvelope { ciphertext, iv: iv.to_vec(), updated_at: now_unix() };
        self.mailbox.merge_envelope(group_id, member_id, &self.self_id, envelope).await?;
        Ok(())
    }
}

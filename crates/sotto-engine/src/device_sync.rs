//! Device-to-device identity transfer
//!
//! Bootstraps a brand-new device by shipping the identity private key over
//! an ephemeral ECDH channel, signaled through a relay store. The owner
//! presents a [`SyncOffer`] out-of-band (typically a QR code); it carries
//! the session id and the owner's ephemeral public key and nothing secret.
//!
//! # State Machines
//!
//! ```text
//! Owner:       Idle ──start──▶ Waiting ──peer joined──▶ Responding ──▶ Done
//! New device:  Idle ──join───▶ Requesting ──published──▶ WaitingForPayload ──▶ Done
//! ```
//!
//! Both sides poll the signaling record and advance on observed status.
//! Any expired, purged, or corrupted session is terminal: the coordinator
//! drops into a `Failed` state it never leaves, and the user starts a new
//! session. Records carry a TTL and a required purge pass, so abandoned
//! sessions cannot be joined later.

use std::sync::Arc;

use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sotto_core::{DEFAULT_SYNC_TTL_SECS, SecureVault, SignalingStore, SyncRecord, SyncStatus};
use sotto_crypto::{
    IdentityKeyPair, decrypt, derive_shared_key, encrypt, public_key_from_spki, random_iv,
};
use tracing::info;

use crate::{error::EngineError, hex_bytes, identity::IdentityManager};

/// Configuration for a device-sync session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Signaling record lifetime in seconds
    pub ttl_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { ttl_secs: DEFAULT_SYNC_TTL_SECS }
    }
}

/// The out-of-band offer payload, e.g. encoded into a QR code.
///
/// Carries exactly the session id and the owner's ephemeral public key,
/// never anything secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOffer {
    /// Signaling session to join
    pub session_id: String,
    /// Owner's ephemeral public key (SPKI DER)
    #[serde(with = "hex_bytes")]
    pub owner_ephemeral_public: Vec<u8>,
}

impl SyncOffer {
    /// Encode for the out-of-band channel.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a scanned offer.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Owner-side sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSyncState {
    /// No session started
    Idle,
    /// Offer published, waiting for the new device to join
    Waiting,
    /// New device joined; encrypting and writing the payload
    Responding,
    /// Payload written, ephemeral secret discarded
    Done,
    /// The session failed terminally; start a new one
    Failed,
}

/// New-device-side sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinerSyncState {
    /// No session joined
    Idle,
    /// Publishing our ephemeral public key
    Requesting,
    /// Join published, waiting for the encrypted payload
    WaitingForPayload,
    /// Identity imported and committed
    Done,
    /// The session failed terminally; start a new one
    Failed,
}

/// Owning-device side of a device-sync session.
///
/// Drives `Idle → Waiting → Responding → Done` over one signaling record,
/// or into the terminal `Failed` state on any session failure. Holds the
/// session's ephemeral private key in memory only; it is discarded (and
/// zeroized on drop) the moment the payload is written.
pub struct SyncOwner<V> {
    identity: Arc<IdentityManager<V>>,
    signaling: Arc<dyn SignalingStore>,
    config: SyncConfig,
    state: OwnerSyncState,
    session_id: Option<String>,
    // Ephemeral pair for this session only, distinct from the long-term
    // identity pair.
    ephemeral: Option<IdentityKeyPair>,
}

impl<V: SecureVault> SyncOwner<V> {
    /// Create an owner-side coordinator.
    pub fn new(
        identity: Arc<IdentityManager<V>>,
        signaling: Arc<dyn SignalingStore>,
        config: SyncConfig,
    ) -> Self {
        Self { identity, signaling, config, state: OwnerSyncState::Idle, session_id: None, ephemeral: None }
    }

    /// Current state.
    pub fn state(&self) -> OwnerSyncState {
        self.state
    }

    /// Start a session at time `now` (unix seconds) and return the offer to
    /// present out-of-band.
    ///
    /// # Errors
    ///
    /// - `IdentityMissing` if this device has no identity to transfer
    /// - `SyncFailed` if a session was already started on this coordinator
    pub async fn start(&mut self, now: u64) -> Result<SyncOffer, EngineError> {
        if self.state != OwnerSyncState::Idle {
            return Err(EngineError::SyncFailed { reason: "session already started".to_string() });
        }
        // Fail before touching the relay if there is nothing to transfer.
        let _ = self.identity.identity_pkcs8()?;

        let ephemeral = IdentityKeyPair::generate();
        let public = ephemeral.export_public()?;
        let session_id = new_session_id();

        self.signaling
            .create(SyncRecord {
                session_id: session_id.clone(),
                owner_ephemeral_public: public.clone(),
                new_device_ephemeral_public: None,
                payload: None,
                payload_iv: None,
                status: SyncStatus::Waiting,
                created_at: now,
                ttl_secs: self.config.ttl_secs,
            })
            .await?;

        self.ephemeral = Some(ephemeral);
        self.session_id = Some(session_id.clone());
        self.state = OwnerSyncState::Waiting;

        info!(%session_id, "device sync session started");
        Ok(SyncOffer { session_id, owner_ephemeral_public: public })
    }

    /// Poll the signaling record at time `now` and advance.
    ///
    /// On observing the new device's join, derives the ephemeral shared
    /// key, writes the encrypted identity payload with status `Completed`,
    /// and discards the ephemeral secret. A `SyncFailed` drops the
    /// coordinator into the terminal `Failed` state.
    pub async fn poll(&mut self, now: u64) -> Result<OwnerSyncState, EngineError> {
        let session_id = match (&self.state, &self.session_id) {
            (OwnerSyncState::Idle, _) => return Ok(OwnerSyncState::Idle),
            (OwnerSyncState::Done, _) => return Ok(OwnerSyncState::Done),
            (OwnerSyncState::Failed, _) => {
                return Err(EngineError::SyncFailed {
                    reason: "session already failed; start a new one".to_string(),
                });
            },
            (_, Some(id)) => id.clone(),
            (_, None) => {
                return Err(EngineError::SyncFailed { reason: "no active session".to_string() });
            },
        };

        let result = self.advance(&session_id, now).await;
        if matches!(result, Err(EngineError::SyncFailed { .. })) {
            self.state = OwnerSyncState::Failed;
            self.ephemeral = None;
        }
        result
    }

    async fn advance(&mut self, session_id: &str, now: u64) -> Result<OwnerSyncState, EngineError> {
        let record = self
            .signaling
            .get(session_id)
            .await?
            .ok_or_else(|| EngineError::SyncFailed { reason: "session record missing".to_string() })?;
        if record.is_expired(now) {
            return Err(EngineError::SyncFailed { reason: "session expired".to_string() });
        }

        match record.status {
            SyncStatus::Waiting => Ok(self.state),
            SyncStatus::Requested => {
                self.state = OwnerSyncState::Responding;
                self.respond(record).await?;
                self.state = OwnerSyncState::Done;
                Ok(OwnerSyncState::Done)
            },
            SyncStatus::Completed => {
                self.state = OwnerSyncState::Done;
                Ok(OwnerSyncState::Done)
            },
        }
    }

    async fn respond(&mut self, mut record: SyncRecord) -> Result<(), EngineError> {
        let peer_spki = record.new_device_ephemeral_public.as_deref().ok_or_else(|| {
            EngineError::SyncFailed { reason: "join without ephemeral key".to_string() }
        })?;
        let peer_public = public_key_from_spki(peer_spki)
            .map_err(|e| EngineError::SyncFailed { reason: format!("malformed join key: {e}") })?;
        let ephemeral = self.ephemeral.as_ref().ok_or_else(|| EngineError::SyncFailed {
            reason: "ephemeral key already discarded".to_string(),
        })?;

        let shared = derive_shared_key(ephemeral.secret_key(), &peer_public);
        let identity_pkcs8 = self.identity.identity_pkcs8()?;
        let iv = random_iv();

        record.payload = Some(encrypt(&identity_pkcs8, &shared, iv));
        record.payload_iv = Some(iv.to_vec());
        record.status = SyncStatus::Completed;
        self.signaling.update(record).await?;

        // Single-use channel: drop the ephemeral secret now.
        self.ephemeral = None;

        info!(session_id = self.session_id.as_deref().unwrap_or(""), "identity payload written");
        Ok(())
    }
}

/// New-device side of a device-sync session.
///
/// Drives `Idle → Requesting → WaitingForPayload → Done`, or into the
/// terminal `Failed` state on any session failure. On completion the
/// transferred identity is imported all-or-nothing: the payload is
/// decrypted and validated before anything is committed to the vault.
pub struct SyncJoiner<V> {
    identity: Arc<IdentityManager<V>>,
    signaling: Arc<dyn SignalingStore>,
    state: JoinerSyncState,
    session_id: Option<String>,
    ephemeral: Option<IdentityKeyPair>,
}

impl<V: SecureVault> SyncJoiner<V> {
    /// Create a joiner-side coordinator.
    pub fn new(identity: Arc<IdentityManager<V>>, signaling: Arc<dyn SignalingStore>) -> Self {
        Self { identity, signaling, state: JoinerSyncState::Idle, session_id: None, ephemeral: None }
    }

    /// Current state.
    pub fn state(&self) -> JoinerSyncState {
        self.state
    }

    /// Join a session from an out-of-band offer at time `now`.
    ///
    /// Generates our ephemeral pair and publishes its public half with
    /// status `Requested`.
    ///
    /// # Errors
    ///
    /// `SyncFailed` if the offer is malformed, the session is unknown,
    /// expired, or already in use; any of these drops the coordinator into
    /// the terminal `Failed` state.
    pub async fn join(&mut self, offer: &SyncOffer, now: u64) -> Result<(), EngineError> {
        if self.state != JoinerSyncState::Idle {
            return Err(EngineError::SyncFailed { reason: "session already joined".to_string() });
        }

        let result = self.try_join(offer, now).await;
        if matches!(result, Err(EngineError::SyncFailed { .. })) {
            self.state = JoinerSyncState::Failed;
            self.ephemeral = None;
        }
        result
    }

    async fn try_join(&mut self, offer: &SyncOffer, now: u64) -> Result<(), EngineError> {
        public_key_from_spki(&offer.owner_ephemeral_public)
            .map_err(|e| EngineError::SyncFailed { reason: format!("malformed offer: {e}") })?;

        let mut record = self
            .signaling
            .get(&offer.session_id)
            .await?
            .ok_or_else(|| EngineError::SyncFailed { reason: "unknown or purged session".to_string() })?;
        if record.is_expired(now) {
            return Err(EngineError::SyncFailed { reason: "session expired".to_string() });
        }
        if record.status != SyncStatus::Waiting {
            return Err(EngineError::SyncFailed { reason: "session already in use".to_string() });
        }

        self.state = JoinerSyncState::Requesting;
        let ephemeral = IdentityKeyPair::generate();
        record.new_device_ephemeral_public = Some(ephemeral.export_public()?);
        record.status = SyncStatus::Requested;
        self.signaling.update(record).await?;

        self.ephemeral = Some(ephemeral);
        self.session_id = Some(offer.session_id.clone());
        self.state = JoinerSyncState::WaitingForPayload;

        info!(session_id = %offer.session_id, "joined device sync session");
        Ok(())
    }

    /// Poll the signaling record at time `now` and advance.
    ///
    /// On observing `Completed`, derives the ephemeral shared key, decrypts
    /// the payload, and imports the identity. Cached pairwise sessions are
    /// cleared as part of the import; they were derived under a different
    /// private key and must be treated as fresh. A `SyncFailed` drops the
    /// coordinator into the terminal `Failed` state.
    pub async fn poll(&mut self, now: u64) -> Result<JoinerSyncState, EngineError> {
        let session_id = match (&self.state, &self.session_id) {
            (JoinerSyncState::Idle, _) => return Ok(JoinerSyncState::Idle),
            (JoinerSyncState::Done, _) => return Ok(JoinerSyncState::Done),
            (JoinerSyncState::Failed, _) => {
                return Err(EngineError::SyncFailed {
                    reason: "session already failed; start a new one".to_string(),
                });
            },
            (_, Some(id)) => id.clone(),
            (_, None) => {
                return Err(EngineError::SyncFailed { reason: "no active session".to_string() });
            },
        };

        let result = self.advance(&session_id, now).await;
        if matches!(result, Err(EngineError::SyncFailed { .. })) {
            self.state = JoinerSyncState::Failed;
            self.ephemeral = None;
        }
        result
    }

    async fn advance(&mut self, session_id: &str, now: u64) -> Result<JoinerSyncState, EngineError> {
        let record = self
            .signaling
            .get(session_id)
            .await?
            .ok_or_else(|| EngineError::SyncFailed { reason: "session record missing".to_string() })?;
        if record.is_expired(now) {
            return Err(EngineError::SyncFailed { reason: "session expired".to_string() });
        }

        match record.status {
            SyncStatus::Waiting | SyncStatus::Requested => Ok(self.state),
            SyncStatus::Completed => {
                self.finish(&record).await?;
                self.state = JoinerSyncState::Done;
                Ok(JoinerSyncState::Done)
            },
        }
    }

    async fn finish(&mut self, record: &SyncRecord) -> Result<(), EngineError> {
        let payload = record.payload.as_deref().ok_or_else(|| EngineError::SyncFailed {
            reason: "completed session carries no payload".to_string(),
        })?;
        let iv = record.payload_iv.as_deref().ok_or_else(|| EngineError::SyncFailed {
            reason: "completed session carries no IV".to_string(),
        })?;
        let owner_public = public_key_from_spki(&record.owner_ephemeral_public)
            .map_err(|e| EngineError::SyncFailed { reason: format!("malformed owner key: {e}") })?;
        let ephemeral = self.ephemeral.as_ref().ok_or_else(|| EngineError::SyncFailed {
            reason: "ephemeral key already discarded".to_string(),
        })?;

        let shared = derive_shared_key(ephemeral.secret_key(), &owner_public);
        let identity_pkcs8 = decrypt(payload, iv, &shared).map_err(|_| EngineError::SyncFailed {
            reason: "payload decryption failed (corrupted or stale session)".to_string(),
        })?;

        // Decrypt succeeded; import validates before committing.
        self.identity.import_identity(&identity_pkcs8).await.map_err(|err| match err {
            EngineError::Crypto(e) => {
                EngineError::SyncFailed { reason: format!("transferred key invalid: {e}") }
            },
            other => other,
        })?;

        self.ephemeral = None;
        info!(session_id = %record.session_id, "identity transferred to this device");
        Ok(())
    }
}

/// Fresh random session id (128 bits, hex).
fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_roundtrips_through_json() {
        let offer = SyncOffer {
            session_id: "abc123".to_string(),
            owner_ephemeral_public: vec![1, 2, 3, 4],
        };

        let json = offer.to_json().unwrap();
        let parsed = SyncOffer::from_json(&json).unwrap();

        assert_eq!(offer, parsed);
    }

    #[test]
    fn offer_json_carries_no_raw_bytes() {
        let offer = SyncOffer {
            session_id: "abc123".to_string(),
            owner_ephemeral_public: vec![0xDE, 0xAD],
        };

        let json = offer.to_json().unwrap();
        assert!(json.contains("dead"), "public key must be hex-encoded: {json}");
    }

    #[test]
    fn session_ids_are_distinct() {
        assert_ne!(new_session_id(), new_session_id());
    }
}

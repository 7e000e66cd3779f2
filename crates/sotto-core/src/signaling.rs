//! Device-sync signaling interface
//!
//! A signaling record relays one device-to-device identity transfer through
//! a third-party document store. Records are short-lived and single-use:
//! created by the owning device, joined by the new device, completed once
//! the encrypted payload is written, and purged after their TTL.
//!
//! ```text
//! ┌─────────┐ owner publishes ┌─────────┐ new device ┌───────────┐ owner ┌───────────┐
//! │ (none)  │────────────────>│ Waiting │───────────>│ Requested │──────>│ Completed │
//! └─────────┘   ephemeral pk  └─────────┘  joins     └───────────┘ payload└───────────┘
//!                                  │                       │                  │
//!                                  └───────── TTL expiry / purge ─────────────┘
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Default signaling record lifetime (10 minutes).
///
/// Sync sessions are user-interactive (scan a QR code, confirm); anything
/// older is abandoned and must be purged rather than left joinable.
pub const DEFAULT_SYNC_TTL_SECS: u64 = 600;

/// Status of a device-sync signaling record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Owner published its ephemeral public key, waiting for the new device
    Waiting,
    /// New device joined and published its own ephemeral public key
    Requested,
    /// Owner wrote the encrypted identity payload
    Completed,
}

/// One device-sync session, relayed through the signaling store.
///
/// Contains nothing secret: both ephemeral halves are public keys and the
/// payload is encrypted under their ECDH-derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Unique session identifier
    pub session_id: String,
    /// Owner's ephemeral public key (SPKI DER)
    pub owner_ephemeral_public: Vec<u8>,
    /// New device's ephemeral public key (SPKI DER), set on join
    pub new_device_ephemeral_public: Option<Vec<u8>>,
    /// Identity private key encrypted under the ephemeral shared key
    pub payload: Option<Vec<u8>>,
    /// IV for `payload`
    pub payload_iv: Option<Vec<u8>>,
    /// Current lifecycle status
    pub status: SyncStatus,
    /// Unix timestamp (seconds) of creation
    pub created_at: u64,
    /// Lifetime in seconds; the record is dead once `created_at + ttl_secs`
    /// has passed
    pub ttl_secs: u64,
}

impl SyncRecord {
    /// Whether this record's TTL has elapsed at time `now` (unix seconds).
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.created_at.saturating_add(self.ttl_secs)
    }
}

/// Read/write access to device-sync signaling records.
#[async_trait]
pub trait SignalingStore: Send + Sync {
    /// Create a new record.
    ///
    /// # Errors
    ///
    /// `Conflict` if a record with the same session id already exists.
    async fn create(&self, record: SyncRecord) -> Result<(), StoreError>;

    /// Point-query a record by session id.
    async fn get(&self, session_id: &str) -> Result<Option<SyncRecord>, StoreError>;

    /// Replace an existing record (status transitions, payload writes).
    ///
    /// # Errors
    ///
    /// `NotFound` if no record with this session id exists.
    async fn update(&self, record: SyncRecord) -> Result<(), StoreError>;

    /// Delete a record. Deleting an absent record is a no-op.
    async fn delete(&self, session_id: &str) -> Result<(), StoreError>;

    /// Remove every record whose TTL elapsed before `now`.
    ///
    /// Returns the number of records removed. This is the required cleanup
    /// pass; callers must run it periodically.
    async fn purge_expired(&self, now: u64) -> Result<usize, StoreError>;
}

/// In-memory signaling store for tests.
#[derive(Clone, Default)]
pub struct MemorySignaling {
    records: Arc<Mutex<HashMap<String, SyncRecord>>>,
}

impl MemorySignaling {
    /// Create an empty signaling store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SyncRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl SignalingStore for MemorySignaling {
    async fn create(&self, record: SyncRecord) -> Result<(), StoreError> {
        let mut records = self.lock();
        if records.contains_key(&record.session_id) {
            return Err(StoreError::Conflict { id: record.session_id });
        }
        records.insert(record.session_id.clone(), record);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SyncRecord>, StoreError> {
        Ok(self.lock().get(session_id).cloned())
    }

    async fn update(&self, record: SyncRecord) -> Result<(), StoreError> {
        let mut records = self.lock();
        if !records.contains_key(&record.session_id) {
            return Err(StoreError::NotFound { id: record.session_id });
        }
        records.insert(record.session_id.clone(), record);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        self.lock().remove(session_id);
        Ok(())
    }

    async fn purge_expired(&self, now: u64) -> Result<usize, StoreError> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        Ok(before - records.len())
    }
}

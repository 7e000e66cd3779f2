//! Key-envelope mailbox interface
//!
//! Each (group, recipient) pair owns a mailbox: a map from sender id to the
//! sender's key envelope addressed to that recipient. Writes MUST merge by
//! sender id and never replace the whole map: sibling senders' envelopes
//! written concurrently must all survive.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A sender key encrypted for exactly one recipient.
///
/// The ciphertext is the sender's raw 32-byte sender key, AES-GCM encrypted
/// under the pairwise session key between sender and recipient. Only that
/// recipient can open it, and only once they hold (or can derive) the same
/// session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEnvelope {
    /// Encrypted sender-key bytes (with GCM tag)
    pub ciphertext: Vec<u8>,
    /// IV the ciphertext was produced with
    pub iv: Vec<u8>,
    /// Unix timestamp (seconds) of the last write
    pub updated_at: u64,
}

/// Read/write access to per-recipient key-envelope mailboxes.
#[async_trait]
pub trait MailboxStore: Send + Sync {
    /// Write `envelope` into the (group, recipient) mailbox under
    /// `sender_id`, preserving all other senders' entries.
    ///
    /// Overwriting one's own previous entry is expected (redistribution is
    /// idempotent); clobbering a sibling sender's entry is a contract
    /// violation.
    async fn merge_envelope(
        &self,
        group_id: &str,
        recipient_id: &str,
        sender_id: &str,
        envelope: KeyEnvelope,
    ) -> Result<(), StoreError>;

    /// Fetch the envelope `sender_id` addressed to `recipient_id` in this
    /// group. `None` means the sender has not distributed yet.
    async fn envelope_from(
        &self,
        group_id: &str,
        recipient_id: &str,
        sender_id: &str,
    ) -> Result<Option<KeyEnvelope>, StoreError>;

    /// Fetch the full mailbox for (group, recipient): sender id → envelope.
    async fn envelopes(
        &self,
        group_id: &str,
        recipient_id: &str,
    ) -> Result<HashMap<String, KeyEnvelope>, StoreError>;
}

type MailboxMap = HashMap<(String, String), HashMap<String, KeyEnvelope>>;

/// In-memory mailbox store for tests.
#[derive(Clone, Default)]
pub struct MemoryMailbox {
    mailboxes: Arc<Mutex<MailboxMap>>,
}

impl MemoryMailbox {
    /// Create an empty mailbox store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MailboxMap> {
        match self.mailboxes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl MailboxStore for MemoryMailbox {
    async fn merge_envelope(
        &self,
        group_id: &str,
        recipient_id: &str,
        sender_id: &str,
        envelope: KeyEnvelope,
    ) -> Result<(), StoreError> {
        self.lock()
            .entry((group_id.to_string(), recipient_id.to_string()))
            .or_default()
            .insert(sender_id.to_string(), envelope);
        Ok(())
    }

    async fn envelope_from(
        &self,
        group_id: &str,
        recipient_id: &str,
        sender_id: &str,
    ) -> Result<Option<KeyEnvelope>, StoreError> {
        Ok(self
            .lock()
            .get(&(group_id.to_string(), recipient_id.to_string()))
            .and_then(|mailbox| mailbox.get(sender_id))
            .cloned())
    }

    async fn envelopes(
        &self,
        group_id: &str,
        recipient_id: &str,
    ) -> Result<HashMap<String, KeyEnvelope>, StoreError> {
        Ok(self
            .lock()
            .get(&(group_id.to_string(), recipient_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

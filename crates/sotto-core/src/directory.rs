//! User directory interface
//!
//! The directory maps a user id to their published identity public key
//! (SPKI DER). It is a remote service; a peer with no published key is an
//! ordinary condition (`Ok(None)`), not an error.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::error::StoreError;

/// Read/write access to published identity public keys.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch the published public key for `user_id`, if any.
    async fn public_key(&self, user_id: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Publish (or republish) the public key for `user_id`.
    async fn set_public_key(&self, user_id: &str, spki: &[u8]) -> Result<(), StoreError>;
}

/// In-memory directory for tests.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn public_key(&self, user_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock().get(user_id).cloned())
    }

    async fn set_public_key(&self, user_id: &str, spki: &[u8]) -> Result<(), StoreError> {
        self.lock().insert(user_id.to_string(), spki.to_vec());
        Ok(())
    }
}

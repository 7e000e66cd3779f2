//! Shared in-memory world for engine integration tests.
//!
//! One `World` holds the remote collaborators (directory, mailboxes,
//! signaling relay); each `Device` gets its own vault, the way each real
//! device does.

#![allow(dead_code, clippy::new_without_default)]

use std::sync::Arc;

use sotto_core::{Directory, MemoryDirectory, MemoryMailbox, MemorySignaling, MemoryVault};
use sotto_engine::{GroupKeyDistributor, IdentityManager, SessionEstablisher};

pub struct World {
    pub directory: Arc<MemoryDirectory>,
    pub mailbox: Arc<MemoryMailbox>,
    pub signaling: Arc<MemorySignaling>,
}

pub struct Device {
    pub user_id: String,
    pub vault: MemoryVault,
    pub identity: Arc<IdentityManager<MemoryVault>>,
    pub sessions: Arc<SessionEstablisher<MemoryVault>>,
    pub groups: GroupKeyDistributor<MemoryVault>,
}

impl World {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(MemoryDirectory::new()),
            mailbox: Arc::new(MemoryMailbox::new()),
            signaling: Arc::new(MemorySignaling::new()),
        }
    }

    /// A device with no identity yet (fresh install).
    pub fn device(&self, user_id: &str) -> Device {
        let vault = MemoryVault::new();
        let directory: Arc<dyn Directory> = self.directory.clone();
        let identity = Arc::new(IdentityManager::new(user_id, vault.clone(), directory.clone()));
        let sessions =
            Arc::new(SessionEstablisher::new(vault.clone(), directory, identity.clone()));
        let groups = GroupKeyDistributor::new(
            user_id,
            vault.clone(),
            self.mailbox.clone(),
            sessions.clone(),
        );
        Device { user_id: user_id.to_string(), vault, identity, sessions, groups }
    }

    /// A device with an established, published identity.
    pub async fn user(&self, user_id: &str) -> Device {
        let device = self.device(user_id);
        device.identity.ensure_identity().await.unwrap();
        device
    }
}

pub fn members(ids: &[&str]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

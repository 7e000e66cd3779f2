//! Sotto storage and collaborator interfaces
//!
//! This crate defines the seams between the E2EE engine and everything it
//! talks to:
//!
//! - [`SecureVault`]: the local, device-scoped store for key handles and raw
//!   secrets. The only mutable shared resource in the system.
//! - [`Directory`]: the user directory mapping a user id to their published
//!   identity public key.
//! - [`MailboxStore`]: per-recipient mailboxes of [`KeyEnvelope`]s (sender
//!   keys wrapped for one recipient).
//! - [`SignalingStore`]: short-lived [`SyncRecord`]s used to relay a
//!   device-to-device identity transfer.
//!
//! The engine depends only on these traits; in-memory implementations
//! ([`MemoryVault`], [`MemoryDirectory`], [`MemoryMailbox`],
//! [`MemorySignaling`]) back the test suites and double as reference
//! semantics, in particular the merge-not-replace rule for mailboxes and
//! the TTL rule for signaling records.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod directory;
mod error;
mod mailbox;
mod signaling;
pub mod vault;

pub use directory::{Directory, MemoryDirectory};
pub use error::{StoreError, VaultError};
pub use mailbox::{KeyEnvelope, MailboxStore, MemoryMailbox};
pub use signaling::{DEFAULT_SYNC_TTL_SECS, MemorySignaling, SignalingStore, SyncRecord, SyncStatus};
pub use vault::{MemoryVault, SecureVault};

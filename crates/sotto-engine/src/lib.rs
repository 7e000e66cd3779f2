//! Sotto E2EE Engine
//!
//! The cryptographic subsystem of a chat application: every direct and
//! group conversation stays confidential against the server, while a user
//! can add new devices and recover lost keys.
//!
//! # Components
//!
//! - [`IdentityManager`]: owns the long-term identity key pair. Generates
//!   it once, persists the private half in the vault, publishes the public
//!   half to the directory. Never overwrites an existing identity.
//! - [`SessionEstablisher`]: derives a pairwise symmetric key with a peer
//!   via ECDH. Both parties derive the identical key independently, so no
//!   network round-trip is needed once both public keys are published.
//! - [`GroupKeyDistributor`]: Sender-Keys scheme. Each member owns one
//!   symmetric sender key, distributed to every other member encrypted
//!   under the pairwise session key and dropped in that member's mailbox.
//! - [`SyncOwner`] / [`SyncJoiner`]: bootstrap a brand-new device by
//!   transferring the identity private key over an ephemeral ECDH channel,
//!   signaled through a relay store (presented to the user as a QR code).
//! - [`backup`]: password-protected export/import of the identity key.
//!
//! # Data Flow
//!
//! ```text
//! IdentityManager ──▶ SessionEstablisher ──▶ GroupKeyDistributor
//!       ▲                                          │
//!       │ (alternate identity sources)             ▼
//! SyncJoiner / backup::import             message encryption
//! ```
//!
//! # Key Lifecycle
//!
//! Sessions and sender keys are cached indefinitely and never rotated;
//! this mirrors the product's current protocol and is isolated behind
//! `sotto_core::vault::keys` so versioned rotation can be added without
//! touching call sites. A compromised key therefore compromises all
//! traffic under it; see DESIGN.md.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backup;
mod device_sync;
mod error;
mod group;
mod hex_bytes;
mod identity;
mod session;

pub use device_sync::{
    JoinerSyncState, OwnerSyncState, SyncConfig, SyncJoiner, SyncOffer, SyncOwner,
};
pub use error::EngineError;
pub use group::{DistributionReport, GroupKeyDistributor};
pub use identity::IdentityManager;
pub use session::SessionEstablisher;

/// Current unix time in whole seconds.
///
/// A clock before the epoch yields 0 rather than an error; timestamps here
/// are advisory (mailbox `updated_at`, backup `timestamp`), never load
/// bearing.
pub(crate) fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

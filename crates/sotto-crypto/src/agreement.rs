//! Pairwise key agreement via ECDH
//!
//! Both parties compute the same session key from (own private, peer
//! public). The x-coordinate of the shared point is used directly as an
//! AES-256 key, so no round-trip or extra derivation state is needed.

use p256::{PublicKey, SecretKey, ecdh};

use crate::keys::{SYMMETRIC_KEY_SIZE, SymmetricKey};

/// Derive a pairwise session key from an ECDH exchange.
///
/// Commutative: `derive_shared_key(a, B) == derive_shared_key(b, A)` for key
/// pairs (a, A) and (b, B). This symmetry is the load-bearing correctness
/// property of the whole engine; both sides derive the identical key
/// independently once the peer's public key is known.
pub fn derive_shared_key(secret: &SecretKey, peer_public: &PublicKey) -> SymmetricKey {
    let shared = ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer_public.as_affine());

    let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
    #[allow(deprecated)]
    bytes.copy_from_slice(shared.raw_secret_bytes().as_slice());
    SymmetricKey::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::IdentityKeyPair;

    #[test]
    fn agreement_is_commutative() {
        let alice = IdentityKeyPair::generate();
        let bob = IdentityKeyPair::generate();

        let alice_side = derive_shared_key(alice.secret_key(), &bob.public_key());
        let bob_side = derive_shared_key(bob.secret_key(), &alice.public_key());

        assert_eq!(alice_side, bob_side, "both parties must derive the identical key");
    }

    #[test]
    fn agreement_is_deterministic() {
        let alice = IdentityKeyPair::generate();
        let bob = IdentityKeyPair::generate();

        let first = derive_shared_key(alice.secret_key(), &bob.public_key());
        let second = derive_shared_key(alice.secret_key(), &bob.public_key());

        assert_eq!(first, second);
    }

    #[test]
    fn different_peers_produce_different_keys() {
        let alice = IdentityKeyPair::generate();
        let bob = IdentityKeyPair::generate();
        let carol = IdentityKeyPair::generate();

        let with_bob = derive_shared_key(alice.secret_key(), &bob.public_key());
        let with_carol = derive_shared_key(alice.secret_key(), &carol.public_key());

        assert_ne!(with_bob, with_carol);
    }

    #[test]
    fn agreement_survives_pkcs8_roundtrip() {
        // A restored identity (device sync, backup import) must derive the
        // same session keys as the original.
        let alice = IdentityKeyPair::generate();
        let bob = IdentityKeyPair::generate();

        let der = alice.export_private().unwrap();
        let restored = IdentityKeyPair::from_pkcs8_der(&der).unwrap();

        let original = derive_shared_key(alice.secret_key(), &bob.public_key());
        let recovered = derive_shared_key(restored.secret_key(), &bob.public_key());

        assert_eq!(original, recovered);
    }
}

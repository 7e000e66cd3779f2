//! Group sender-key distribution scenarios
//!
//! A three-member group: the first sender distributes their sender key,
//! every other member independently resolves it, and all of them decrypt
//! the same message identically.

mod common;

use common::{World, members};
use sotto_crypto::{decrypt, encrypt, random_iv};

#[tokio::test]
async fn first_send_reaches_every_member() {
    let world = World::new();
    let alice = world.user("alice").await;
    let bob = world.user("bob").await;
    let carol = world.user("carol").await;

    // Alice's first group send triggers distribution.
    let group = members(&["alice", "bob", "carol"]);
    let report = alice.groups.distribute_own_key("trio", &group).await.unwrap();
    assert!(report.is_complete());

    let sender_key = alice.groups.own_sender_key("trio").await.unwrap();
    let iv = random_iv();
    let ciphertext = encrypt(b"hi all", &sender_key, iv);

    // Bob and Carol each resolve Alice's key on their own and decrypt.
    for member in [&bob, &carol] {
        let resolved = member.groups.peer_sender_key("trio", "alice").await.unwrap().unwrap();
        assert_eq!(resolved, sender_key);
        assert_eq!(decrypt(&ciphertext, &iv, &resolved).unwrap(), b"hi all");
    }
}

#[tokio::test]
async fn redistribution_is_idempotent() {
    let world = World::new();
    let alice = world.user("alice").await;
    let bob = world.user("bob").await;

    let group = members(&["alice", "bob"]);
    alice.groups.distribute_own_key("duo", &group).await.unwrap();
    let first = bob.groups.peer_sender_key("duo", "alice").await.unwrap().unwrap();

    // A redundant distribution must not change the key anyone resolves.
    alice.groups.distribute_own_key("duo", &group).await.unwrap();
    let second = bob.groups.peer_sender_key("duo", "alice").await.unwrap().unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn partial_distribution_heals_on_the_next_call() {
    let world = World::new();
    let alice = world.user("alice").await;
    let bob = world.user("bob").await;
    let carol = world.device("carol"); // not yet published

    let group = members(&["alice", "bob", "carol"]);
    let report = alice.groups.distribute_own_key("trio", &group).await.unwrap();

    assert_eq!(report.delivered, vec!["bob".to_string()]);
    assert_eq!(report.failed.len(), 1, "carol alone fails, bob is unaffected");
    assert!(bob.groups.peer_sender_key("trio", "alice").await.unwrap().is_some());

    // Carol finishes setup; the next distribution pass completes the group.
    carol.identity.ensure_identity().await.unwrap();
    let report = alice.groups.distribute_own_key("trio", &group).await.unwrap();
    assert!(report.is_complete());

    let resolved = carol.groups.peer_sender_key("trio", "alice").await.unwrap().unwrap();
    assert_eq!(resolved, alice.groups.own_sender_key("trio").await.unwrap());
}

#[tokio::test]
async fn undistributed_key_renders_as_pending_not_error() {
    let world = World::new();
    let alice = world.user("alice").await;
    let bob = world.user("bob").await;

    // Bob opens the conversation before Alice has ever sent.
    let pending = bob.groups.peer_sender_key("trio", "alice").await.unwrap();
    assert!(pending.is_none());

    let _ = alice;
}

#[tokio::test]
async fn each_member_owns_a_distinct_sender_key() {
    let world = World::new();
    let alice = world.user("alice").await;
    let bob = world.user("bob").await;

    let group = members(&["alice", "bob"]);
    alice.groups.distribute_own_key("duo", &group).await.unwrap();
    bob.groups.distribute_own_key("duo", &group).await.unwrap();

    let alice_key = alice.groups.own_sender_key("duo").await.unwrap();
    let bob_key = bob.groups.own_sender_key("duo").await.unwrap();
    assert_ne!(alice_key, bob_key);

    // Each resolves the other's, not their own.
    assert_eq!(alice.groups.peer_sender_key("duo", "bob").await.unwrap().unwrap(), bob_key);
    assert_eq!(bob.groups.peer_sender_key("duo", "alice").await.unwrap().unwrap(), alice_key);
}

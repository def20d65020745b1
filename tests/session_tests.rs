//! Session lifecycle: signed-claim integrity, last-write-wins, destroy
//! idempotence and change notification.

use std::sync::Arc;

use minierp_console::identity::{
    Identity, MemoryBackend, Role, SessionCodec, SessionStatus, SessionStore,
};

fn identity(role: Role) -> Identity {
    Identity {
        id: "u-42".into(),
        name: "Rae".into(),
        email: "rae@example.com".into(),
        role,
        verified: true,
        active: true,
    }
}

#[test]
fn read_after_destroy_is_none_and_destroy_is_idempotent() {
    let store = SessionStore::in_memory(SessionCodec::ephemeral());
    store.create(&identity(Role::Manager), "tok");
    assert!(store.read().is_some());

    store.destroy();
    assert!(store.read().is_none());
    // Second destroy leaves the same absent state
    store.destroy();
    assert!(store.read().is_none());
    assert_eq!(store.status(), SessionStatus::Unauthenticated);
}

#[test]
fn create_supersedes_with_last_write_wins() {
    let store = SessionStore::in_memory(SessionCodec::ephemeral());
    store.create(&identity(Role::Staff), "first");
    store.create(&identity(Role::Admin), "second");
    let s = store.read().expect("live session");
    assert_eq!(s.role(), Role::Admin);
    assert_eq!(s.credential, "second");
}

#[test]
fn tampered_token_reads_as_no_session() {
    let codec = SessionCodec::ephemeral();
    let minted = SessionStore::in_memory(codec.clone());
    minted.create(&identity(Role::Staff), "tok");
    let token = minted.token().expect("token");

    // Flip a character inside the payload half of the token
    let mut chars: Vec<char> = token.chars().collect();
    chars[4] = if chars[4] == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();

    let backend = Arc::new(MemoryBackend::with_token(&tampered));
    let store = SessionStore::new(codec, backend);
    assert!(store.read().is_none());
}

#[test]
fn token_minted_under_other_key_reads_as_no_session() {
    let minted = SessionStore::in_memory(SessionCodec::ephemeral());
    minted.create(&identity(Role::Admin), "tok");
    let token = minted.token().expect("token");

    let backend = Arc::new(MemoryBackend::with_token(&token));
    let store = SessionStore::new(SessionCodec::ephemeral(), backend);
    assert!(store.read().is_none());
}

#[test]
fn claims_projection_is_refreshed_per_read() {
    let codec = SessionCodec::ephemeral();
    let backend = Arc::new(MemoryBackend::new());
    let store = SessionStore::new(codec.clone(), backend.clone());
    store.create(&identity(Role::Staff), "tok-a");
    assert_eq!(store.read().unwrap().credential, "tok-a");

    // Swap the backing token out from under the store; the next read
    // projects the new claims.
    let other = SessionStore::new(codec, backend);
    other.create(&identity(Role::Manager), "tok-b");
    let s = store.read().unwrap();
    assert_eq!(s.role(), Role::Manager);
    assert_eq!(s.credential, "tok-b");
}

#[tokio::test]
async fn subscribers_observe_create_and_destroy() {
    let store = SessionStore::in_memory(SessionCodec::ephemeral());
    let mut rx = store.subscribe();
    assert_eq!(*rx.borrow(), SessionStatus::Loading);

    store.create(&identity(Role::Staff), "tok");
    rx.changed().await.expect("create notifies");
    assert_eq!(*rx.borrow_and_update(), SessionStatus::Authenticated);

    store.destroy();
    rx.changed().await.expect("destroy notifies");
    assert_eq!(*rx.borrow_and_update(), SessionStatus::Unauthenticated);
}

//! Session store: the live, signed proof of authentication for one browser
//! context. Claims travel as an opaque signed token held by a pluggable
//! backing store; the projection returned by `read()` is re-decoded and
//! re-verified on every call.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::tprintln;

use super::claims::{SessionClaims, SessionCodec};
use super::principal::Identity;
use super::role::Role;

/// Client-visible projection of the session claims. Never contains the
/// signing key; holders cannot mint a role upgrade from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub identity: Identity,
    /// Bearer credential attached to outbound backend calls.
    pub credential: String,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn from_claims(claims: SessionClaims) -> Self {
        let issued_at = Utc
            .timestamp_millis_opt(claims.issued_at)
            .single()
            .unwrap_or_else(Utc::now);
        Self { identity: claims.identity(), credential: claims.credential, issued_at }
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }
}

/// Resolution state published to guard and monitor subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Initial resolution (cookie decode, login round-trip) still pending.
    Loading,
    Unauthenticated,
    Authenticated,
}

/// Where the signed token lives between requests. In-memory for tests and
/// the interactive shell; the HTTP shell transports the same token in a
/// cookie and primes a per-request store from it.
pub trait SessionBackend: Send + Sync {
    fn put(&self, token: &str);
    fn get(&self) -> Option<String>;
    fn clear(&self);
}

#[derive(Default)]
pub struct MemoryBackend {
    slot: RwLock<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self { slot: RwLock::new(Some(token.to_string())) }
    }
}

impl SessionBackend for MemoryBackend {
    fn put(&self, token: &str) {
        *self.slot.write() = Some(token.to_string());
    }

    fn get(&self) -> Option<String> {
        self.slot.read().clone()
    }

    fn clear(&self) {
        *self.slot.write() = None;
    }
}

/// Create/read/destroy over signed claims. Writes are last-write-wins:
/// `create` always supersedes whatever was there. Cloning shares the same
/// backing store and change feed.
#[derive(Clone)]
pub struct SessionStore {
    codec: Arc<SessionCodec>,
    backend: Arc<dyn SessionBackend>,
    status_tx: Arc<watch::Sender<SessionStatus>>,
}

impl SessionStore {
    pub fn new(codec: SessionCodec, backend: Arc<dyn SessionBackend>) -> Self {
        let (tx, _rx) = watch::channel(SessionStatus::Loading);
        Self { codec: Arc::new(codec), backend, status_tx: Arc::new(tx) }
    }

    /// Convenience constructor with an empty in-memory backend.
    pub fn in_memory(codec: SessionCodec) -> Self {
        Self::new(codec, Arc::new(MemoryBackend::new()))
    }

    /// Mark the initial resolution complete and publish the observed state.
    /// Consumers stuck on `Loading` (the route guard) unblock here.
    pub fn resolve(&self) {
        let status = if self.read().is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        };
        // send_replace: the value must update even with no live subscribers
        self.status_tx.send_replace(status);
    }

    /// Establish a new signed session, superseding any existing one.
    pub fn create(&self, identity: &Identity, credential: &str) -> Session {
        let claims = SessionClaims::new(identity, credential);
        let token = self.codec.encode(&claims);
        self.backend.put(&token);
        self.status_tx.send_replace(SessionStatus::Authenticated);
        tprintln!("session.create user={} role={}", identity.id, identity.role);
        Session::from_claims(claims)
    }

    /// Decode and verify the backed token. Malformed or tampered tokens
    /// read as no session.
    pub fn read(&self) -> Option<Session> {
        let token = self.backend.get()?;
        let claims = self.codec.decode(&token)?;
        Some(Session::from_claims(claims))
    }

    /// The raw signed token, for transports that carry it (cookies).
    pub fn token(&self) -> Option<String> {
        self.backend.get()
    }

    /// Invalidate immediately. Idempotent; whether a redirect follows is
    /// the caller's business, the store never navigates.
    pub fn destroy(&self) {
        self.backend.clear();
        self.status_tx.send_replace(SessionStatus::Unauthenticated);
    }

    pub fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }

    /// Change feed for guard/monitor re-evaluation.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }
}

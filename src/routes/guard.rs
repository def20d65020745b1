//! View-level route guard: the second, defense-in-depth authorization check
//! run by a mounted protected view. Uses the same primitives as the policy
//! middleware; the extra input is the view's allowed-role set.

use std::collections::HashSet;

use tokio::sync::watch;

use crate::identity::{Role, Session, SessionStatus, SessionStore};

use super::policy::{DASHBOARD_PATH, LOGIN_PATH};

/// Per-view decision. An empty allowed set means any authenticated,
/// non-redirected role may view.
///
/// Wrong-role actors go to the generic dashboard home, not their role home:
/// this check is per-view, the global customer redirect has already
/// happened in the policy middleware.
pub fn view_redirect(role: Option<Role>, allowed: &HashSet<Role>) -> Option<&'static str> {
    match role {
        None => Some(LOGIN_PATH),
        Some(r) if allowed.is_empty() || allowed.contains(&r) => None,
        Some(_) => Some(DASHBOARD_PATH),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    /// Session resolution still in flight; render nothing conclusive.
    Pending,
    /// The resolved session, exposed for conditional rendering. The
    /// backend still enforces authorization on every call; this is a
    /// convenience, never the sole check.
    Allow(Session),
    Redirect(&'static str),
}

/// Guard attached to a protected view. Re-evaluate via `state()` whenever
/// `changes()` fires, not just on mount.
pub struct RouteGuard {
    store: SessionStore,
    allowed: HashSet<Role>,
}

impl RouteGuard {
    pub fn new(store: SessionStore, allowed: impl IntoIterator<Item = Role>) -> Self {
        Self { store, allowed: allowed.into_iter().collect() }
    }

    pub fn state(&self) -> GuardState {
        match self.store.status() {
            SessionStatus::Loading => GuardState::Pending,
            SessionStatus::Unauthenticated => GuardState::Redirect(LOGIN_PATH),
            SessionStatus::Authenticated => {
                let session = self.store.read();
                let role = session.as_ref().map(|s| s.role());
                match view_redirect(role, &self.allowed) {
                    Some(target) => GuardState::Redirect(target),
                    None => match session {
                        Some(s) => GuardState::Allow(s),
                        // Claims went bad between status and read
                        None => GuardState::Redirect(LOGIN_PATH),
                    },
                }
            }
        }
    }

    /// Change feed; each notification warrants a fresh `state()` call.
    pub fn changes(&self) -> watch::Receiver<SessionStatus> {
        self.store.subscribe()
    }

    /// Wait out the Loading phase and return the first conclusive state.
    pub async fn resolved(&self) -> GuardState {
        let mut rx = self.changes();
        loop {
            match self.state() {
                GuardState::Pending => {
                    if rx.changed().await.is_err() {
                        return GuardState::Redirect(LOGIN_PATH);
                    }
                }
                conclusive => return conclusive,
            }
        }
    }
}

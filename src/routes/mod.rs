//! Route classification, the pure authorization policy, and the view-level
//! guard that re-derives the same policy client-side.

mod guard;
mod policy;

pub use guard::{view_redirect, GuardState, RouteGuard};
pub use policy::{
    classify, decide, role_home, Decision, RouteClass, DASHBOARD_PATH, LOGIN_PATH,
    PROTECTED_PREFIX, REGISTER_PATH, STOREFRONT_PATH,
};

/// Imperative redirect seam. The HTTP shell answers redirects in its
/// responses; long-lived shells (and tests) implement this to observe the
/// monitor's and the API client's forced navigations.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Navigator that only records the redirect in the log. Used where the
/// response itself carries the redirect.
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect(&self, path: &str) {
        tracing::info!(target: "nav", "redirect {}", path);
    }
}

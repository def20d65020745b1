//! The route policy engine: a pure function over already-resolved session
//! state. Evaluated by the shell's middleware before any protected view
//! renders, and re-derived identically by the view-level guard.

use serde::Serialize;

use crate::identity::Role;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const STOREFRONT_PATH: &str = "/products";
pub const DASHBOARD_PATH: &str = "/protected/dashboard";
pub const PROTECTED_PREFIX: &str = "/protected";

/// Static classification of every path the console serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    Public,
    Protected,
    AuthOnly,
}

pub fn classify(path: &str) -> RouteClass {
    if path.starts_with(PROTECTED_PREFIX) {
        RouteClass::Protected
    } else if path.starts_with(LOGIN_PATH) || path.starts_with(REGISTER_PATH) {
        RouteClass::AuthOnly
    } else {
        RouteClass::Public
    }
}

/// Default landing path per role. Total: every role has a home.
pub fn role_home(role: Role) -> &'static str {
    match role {
        Role::Customer => STOREFRONT_PATH,
        Role::Admin | Role::Manager | Role::Staff => DASHBOARD_PATH,
    }
}

/// Outcome of a policy evaluation. "Deny unauthenticated" and "deny
/// unauthorized" are distinct: the former goes to login, the latter is an
/// authenticated actor bounced to its own home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    /// No live session on a protected path.
    ToLogin,
    /// Live session, wrong area: customers on protected paths, anyone
    /// authenticated on the login/register pages.
    ToRoleHome(&'static str),
}

impl Decision {
    /// Redirect target, if any.
    pub fn target(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::ToLogin => Some(LOGIN_PATH),
            Decision::ToRoleHome(p) => Some(p),
        }
    }
}

/// decide(role, path): `role` is None when no live session exists.
/// Synchronous policy logic over already-resolved state; no retries.
pub fn decide(role: Option<Role>, path: &str) -> Decision {
    match classify(path) {
        RouteClass::Protected => match role {
            None => Decision::ToLogin,
            // Authenticated but unauthorized for the back office: bounce to
            // the storefront, never to login.
            Some(Role::Customer) => Decision::ToRoleHome(role_home(Role::Customer)),
            Some(_) => Decision::Allow,
        },
        RouteClass::AuthOnly => match role {
            Some(r) => Decision::ToRoleHome(role_home(r)),
            None => Decision::Allow,
        },
        RouteClass::Public => Decision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(classify("/"), RouteClass::Public);
        assert_eq!(classify("/products"), RouteClass::Public);
        assert_eq!(classify("/login"), RouteClass::AuthOnly);
        assert_eq!(classify("/login?session=expired"), RouteClass::AuthOnly);
        assert_eq!(classify("/register"), RouteClass::AuthOnly);
        assert_eq!(classify("/protected"), RouteClass::Protected);
        assert_eq!(classify("/protected/orders"), RouteClass::Protected);
    }

    #[test]
    fn role_home_is_total() {
        assert_eq!(role_home(Role::Customer), STOREFRONT_PATH);
        for r in Role::BACK_OFFICE {
            assert_eq!(role_home(r), DASHBOARD_PATH);
        }
    }
}

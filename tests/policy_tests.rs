//! Route policy engine properties: the full decision table, the
//! customer/storefront tie-break, and redirect targets.

use minierp_console::identity::Role;
use minierp_console::routes::{
    classify, decide, role_home, Decision, RouteClass, DASHBOARD_PATH, LOGIN_PATH, STOREFRONT_PATH,
};

const PROTECTED_PATHS: [&str; 5] = [
    "/protected/dashboard",
    "/protected/orders",
    "/protected/products",
    "/protected/employees",
    "/protected/about-us",
];

const AUTH_ONLY_PATHS: [&str; 2] = ["/login", "/register"];

const PUBLIC_PATHS: [&str; 2] = ["/", "/products"];

#[test]
fn back_office_roles_pass_protected_paths() {
    for role in Role::BACK_OFFICE {
        for path in PROTECTED_PATHS {
            assert_eq!(
                decide(Some(role), path),
                Decision::Allow,
                "{role} should pass {path}"
            );
        }
    }
}

#[test]
fn customer_on_protected_goes_to_storefront_never_login() {
    for path in PROTECTED_PATHS {
        let d = decide(Some(Role::Customer), path);
        assert_eq!(d, Decision::ToRoleHome(STOREFRONT_PATH), "customer on {path}");
        assert_ne!(d.target(), Some(LOGIN_PATH), "customer must not bounce to login");
    }
}

#[test]
fn anonymous_on_protected_goes_to_login() {
    for path in PROTECTED_PATHS {
        let d = decide(None, path);
        assert_eq!(d, Decision::ToLogin);
        assert_eq!(d.target(), Some(LOGIN_PATH));
    }
}

#[test]
fn authenticated_on_auth_only_bounces_to_role_home() {
    for role in Role::ALL {
        for path in AUTH_ONLY_PATHS {
            assert_eq!(
                decide(Some(role), path),
                Decision::ToRoleHome(role_home(role)),
                "{role} on {path}"
            );
        }
    }
}

#[test]
fn anonymous_on_auth_only_is_allowed() {
    for path in AUTH_ONLY_PATHS {
        assert_eq!(decide(None, path), Decision::Allow);
    }
}

#[test]
fn public_paths_always_allowed() {
    for path in PUBLIC_PATHS {
        assert_eq!(decide(None, path), Decision::Allow);
        for role in Role::ALL {
            assert_eq!(decide(Some(role), path), Decision::Allow);
        }
    }
}

#[test]
fn role_home_mapping() {
    assert_eq!(role_home(Role::Customer), STOREFRONT_PATH);
    assert_eq!(role_home(Role::Admin), DASHBOARD_PATH);
    assert_eq!(role_home(Role::Manager), DASHBOARD_PATH);
    assert_eq!(role_home(Role::Staff), DASHBOARD_PATH);
}

#[test]
fn classification_is_prefix_based() {
    assert_eq!(classify("/protected/anything/nested"), RouteClass::Protected);
    assert_eq!(classify("/login"), RouteClass::AuthOnly);
    assert_eq!(classify("/register"), RouteClass::AuthOnly);
    assert_eq!(classify("/products"), RouteClass::Public);
    assert_eq!(classify("/"), RouteClass::Public);
}

#[test]
fn allow_has_no_redirect_target() {
    assert_eq!(Decision::Allow.target(), None);
    assert_eq!(Decision::ToRoleHome(DASHBOARD_PATH).target(), Some(DASHBOARD_PATH));
}

//!
//! minierp console shell
//! ---------------------
//! Axum application serving the admin console routes. Responsibilities:
//! - Route policy middleware: the pure `decide` function runs before any
//!   handler, so a denied navigation never renders protected content.
//! - Login/register/logout backed by the credential verifier, with the
//!   signed session carried in an HttpOnly cookie.
//! - Protected pages with view-level role gating (second, defense-in-depth
//!   check via the same guard primitives).
//! - Backend data access through the bearer-attaching API client; a 401
//!   from the backend invalidates the session and forces re-login.
//!
//! Page bodies are deliberately minimal; rendering is not this layer's job.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Extension, Query, Request, State};
use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::AppError;
use crate::identity::{
    AuthError, CredentialVerifier, MemoryBackend, Role, Session, SessionCodec, SessionStore,
};
use crate::routes::{
    decide, role_home, view_redirect, Decision, Navigator, TracingNavigator, LOGIN_PATH,
};

const SESSION_COOKIE: &str = "minierp_session";

/// Shared shell state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<SessionCodec>,
    pub http: reqwest::Client,
    pub verifier: Arc<CredentialVerifier>,
    pub api_url: String,
    pub nav: Arc<dyn Navigator>,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::new();
        let verifier = CredentialVerifier::with_client(http.clone(), &config.api_url)?;
        Ok(Self {
            codec: Arc::new(SessionCodec::new(config.session_key)),
            http,
            verifier: Arc::new(verifier),
            api_url: config.api_url.clone(),
            nav: Arc::new(TracingNavigator),
        })
    }
}

/// Per-request context inserted by the policy middleware once a navigation
/// is allowed. The store is primed from the request's session cookie.
#[derive(Clone)]
pub struct RequestContext {
    pub store: SessionStore,
    pub session: Option<Session>,
    pub request_id: String,
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config)?;
    let app = build_router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting console shell on {} (backend: {})", addr, config.api_url);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/products", get(storefront))
        .route("/login", get(login_page).post(login_submit))
        .route("/register", get(register_page).post(register_submit))
        .route("/logout", post(logout))
        .route("/protected/dashboard", get(dashboard))
        .route("/protected/products", get(products_admin))
        .route("/protected/orders", get(orders))
        .route("/protected/customers", get(customers))
        .route("/protected/employees", get(employees))
        .route("/protected/attendance", get(attendance))
        .route("/protected/reports", get(reports))
        .route("/protected/about-us", get(about_us))
        .layer(middleware::from_fn_with_state(state.clone(), route_policy))
        .with_state(state)
}

// ---- session cookie plumbing ----

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

fn set_session_cookie(token: &str) -> HeaderValue {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Secure; SameSite=Strict; Path=/",
        SESSION_COOKIE, token
    ))
    .unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/",
        SESSION_COOKIE
    ))
    .unwrap()
}

/// Build a per-request session store primed from the request's cookie.
/// The same codec verifies here and in any other shell, so a forged cookie
/// degrades to "no session" rather than erroring.
fn session_store_for(state: &AppState, headers: &HeaderMap) -> SessionStore {
    let backend = match parse_cookie(headers, SESSION_COOKIE) {
        Some(token) => MemoryBackend::with_token(&token),
        None => MemoryBackend::new(),
    };
    let store = SessionStore::new((*state.codec).clone(), Arc::new(backend));
    store.resolve();
    store
}

// ---- route policy middleware ----

/// Evaluated on every request, before the handler: no protected view is
/// rendered (or even reached) on a denied navigation.
async fn route_policy(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let store = session_store_for(&state, req.headers());
    let session = store.read();
    let role = session.as_ref().map(|s| s.role());
    match decide(role, &path) {
        Decision::Allow => {
            let ctx = RequestContext {
                store,
                session,
                request_id: uuid::Uuid::new_v4().to_string(),
            };
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        denied => {
            let target = denied.target().unwrap_or(LOGIN_PATH);
            info!(target: "policy", path = %path, to = target, "navigation denied");
            Redirect::to(target).into_response()
        }
    }
}

// ---- page shells ----

fn page(title: &str, body: String) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><title>{title} - Mini ERP</title></head><body><h1>{title}</h1>{body}</body></html>"
    ))
}

/// View-level gate shared by the protected handlers: middleware already
/// rejected anonymous and customer actors, this narrows by the view's own
/// allowed-role set.
fn guarded_page(
    ctx: &RequestContext,
    allowed: &[Role],
    title: &str,
    body: impl FnOnce(&Session) -> String,
) -> Response {
    let allowed: HashSet<Role> = allowed.iter().copied().collect();
    let role = ctx.session.as_ref().map(|s| s.role());
    match view_redirect(role, &allowed) {
        Some(target) => Redirect::to(target).into_response(),
        None => match &ctx.session {
            Some(s) => page(title, body(s)).into_response(),
            None => Redirect::to(LOGIN_PATH).into_response(),
        },
    }
}

// ---- public pages ----

async fn landing() -> Html<String> {
    page(
        "Mini ERP",
        "<p>Welcome.</p><p><a href=\"/products\">Browse products</a> | <a href=\"/login\">Sign in</a></p>".to_string(),
    )
}

async fn storefront(Extension(ctx): Extension<RequestContext>) -> Html<String> {
    // Public surface: customers (and anonymous visitors) browse here. The
    // back-office inactivity monitor is what tears a staff session down on
    // arrival, not this handler.
    let greeting = match &ctx.session {
        Some(s) => format!("<p>Signed in as {}</p>", s.identity.name),
        None => "<p><a href=\"/login\">Sign in</a></p>".to_string(),
    };
    page("Products", format!("<p>Storefront catalog.</p>{greeting}"))
}

// ---- auth pages ----

#[derive(Debug, Deserialize)]
struct LoginQuery {
    session: Option<String>,
}

async fn login_page(Query(q): Query<LoginQuery>) -> Html<String> {
    // The notice renders into this one response only; a reload without the
    // marker shows nothing.
    let notice = if q.session.as_deref() == Some("expired") {
        "<p class=\"notice\">You were logged out due to inactivity</p>"
    } else {
        ""
    };
    page(
        "Sign in",
        format!(
            "{notice}<form method=\"post\" action=\"/login\">\
             <input name=\"email\" type=\"email\" placeholder=\"Email\">\
             <input name=\"password\" type=\"password\" placeholder=\"Password\">\
             <button type=\"submit\">Sign in</button></form>\
             <p><a href=\"/register\">Create an account</a></p>"
        ),
    )
}

fn login_error(message: &str) -> Html<String> {
    page(
        "Sign in",
        format!(
            "<p class=\"error\">{message}</p><p><a href=\"/login\">Try again</a></p>"
        ),
    )
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    if form.email.trim().is_empty() || form.password.is_empty() {
        return login_error("Email and password are required").into_response();
    }
    match state.verifier.authenticate(form.email.trim(), &form.password).await {
        Ok(v) => {
            let store = SessionStore::in_memory((*state.codec).clone());
            store.create(&v.identity, &v.credential);
            let token = store.token().unwrap_or_default();
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, set_session_cookie(&token));
            info!(target: "auth", user = %v.identity.email, role = %v.identity.role, "login ok");
            (headers, Redirect::to(role_home(v.identity.role))).into_response()
        }
        // Distinct, actionable message for the unverified case
        Err(AuthError::UnverifiedAccount(_)) => login_error(
            "Please verify your email before logging in. Check your inbox for the verification link.",
        )
        .into_response(),
        Err(AuthError::InvalidCredentials) => login_error("Invalid email or password").into_response(),
        Err(AuthError::NetworkOrServer(e)) => {
            error!("login error: {e}");
            login_error("Something went wrong during login, please try again").into_response()
        }
    }
}

async fn register_page() -> Html<String> {
    page(
        "Register",
        "<form method=\"post\" action=\"/register\">\
         <input name=\"name\" placeholder=\"Name\">\
         <input name=\"email\" type=\"email\" placeholder=\"Email\">\
         <input name=\"password\" type=\"password\" placeholder=\"Password\">\
         <button type=\"submit\">Create account</button></form>"
            .to_string(),
    )
}

#[derive(Debug, Deserialize)]
struct RegisterForm {
    name: String,
    email: String,
    password: String,
    role: Option<String>,
}

async fn register_submit(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    if form.name.trim().is_empty() || form.email.trim().is_empty() || form.password.is_empty() {
        return login_error("Name, email and password are required").into_response();
    }
    let role = form.role.as_deref().and_then(Role::parse);
    match state
        .verifier
        .register(form.name.trim(), form.email.trim(), &form.password, role)
        .await
    {
        Ok(v) => {
            let store = SessionStore::in_memory((*state.codec).clone());
            store.create(&v.identity, &v.credential);
            let token = store.token().unwrap_or_default();
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, set_session_cookie(&token));
            (headers, Redirect::to(role_home(v.identity.role))).into_response()
        }
        Err(AuthError::UnverifiedAccount(_)) => login_error(
            "Account created. Verify your email before logging in.",
        )
        .into_response(),
        Err(AuthError::InvalidCredentials) => login_error("Registration was rejected").into_response(),
        Err(AuthError::NetworkOrServer(e)) => {
            error!("register error: {e}");
            login_error("Something went wrong during registration, please try again").into_response()
        }
    }
}

async fn logout(Extension(ctx): Extension<RequestContext>) -> Response {
    ctx.store.destroy();
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, clear_session_cookie());
    (headers, Redirect::to(LOGIN_PATH)).into_response()
}

// ---- protected pages ----

async fn dashboard(Extension(ctx): Extension<RequestContext>) -> Response {
    guarded_page(&ctx, &Role::BACK_OFFICE, "Dashboard", |s| {
        format!(
            "<p>Hello {}, you are signed in as {}.</p><p>Sales and stock charts render here.</p>",
            s.identity.name,
            s.role()
        )
    })
}

async fn products_admin(Extension(ctx): Extension<RequestContext>) -> Response {
    guarded_page(&ctx, &Role::BACK_OFFICE, "Product management", |s| {
        // Destructive controls render for admins only; the backend enforces
        // the same rule on the actual delete call.
        let delete_controls = if s.role() == Role::Admin {
            "<button>Delete product</button>"
        } else {
            ""
        };
        format!("<p>Product table renders here.</p>{delete_controls}")
    })
}

async fn orders(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> Response {
    let allowed: HashSet<Role> = Role::BACK_OFFICE.into_iter().collect();
    let role = ctx.session.as_ref().map(|s| s.role());
    if let Some(target) = view_redirect(role, &allowed) {
        return Redirect::to(target).into_response();
    }
    let client = match ApiClient::with_client(
        state.http.clone(),
        &state.api_url,
        ctx.store.clone(),
        state.nav.clone(),
    ) {
        Ok(c) => c,
        Err(e) => {
            error!("api client setup failed: {e}");
            return page("Orders", "<p class=\"error\">Backend unavailable.</p>".to_string()).into_response();
        }
    };
    match client.get("orders").await {
        Ok(val) => {
            let count = val
                .get("data")
                .and_then(|d| d.get("orders"))
                .and_then(|o| o.as_array())
                .map(|a| a.len())
                .unwrap_or(0);
            page("Orders", format!("<p>{count} orders loaded.</p>")).into_response()
        }
        Err(AppError::Auth { .. }) => {
            // The client already destroyed the session; finish the hard
            // redirect by clearing the cookie.
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, clear_session_cookie());
            (headers, Redirect::to(LOGIN_PATH)).into_response()
        }
        Err(e) => {
            error!("orders fetch failed: {e}");
            page("Orders", format!("<p class=\"error\">Could not load orders: {}</p>", e.message()))
                .into_response()
        }
    }
}

async fn customers(Extension(ctx): Extension<RequestContext>) -> Response {
    guarded_page(&ctx, &Role::BACK_OFFICE, "Customers", |_| {
        "<p>Customer table renders here.</p>".to_string()
    })
}

async fn employees(Extension(ctx): Extension<RequestContext>) -> Response {
    guarded_page(&ctx, &[Role::Admin, Role::Manager], "Employees", |_| {
        "<p>Employee management renders here.</p>".to_string()
    })
}

async fn attendance(Extension(ctx): Extension<RequestContext>) -> Response {
    guarded_page(&ctx, &Role::BACK_OFFICE, "Attendance", |s| {
        format!("<p>Attendance for {} renders here.</p>", s.identity.name)
    })
}

async fn reports(Extension(ctx): Extension<RequestContext>) -> Response {
    guarded_page(&ctx, &Role::BACK_OFFICE, "Reports", |_| {
        "<p>Report exports render here.</p>".to_string()
    })
}

async fn about_us(Extension(ctx): Extension<RequestContext>) -> Response {
    // Content editor is admin-only
    guarded_page(&ctx, &[Role::Admin], "About us editor", |_| {
        "<p>Rich-text page editor renders here.</p>".to_string()
    })
}

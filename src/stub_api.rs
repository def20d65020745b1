//! Development stand-in for the remote ERP REST API. Serves just enough of
//! the auth surface (plus one representative data resource) for local runs
//! and integration tests: argon2-verified logins, the "verify" message for
//! unverified accounts, and bearer-token enforcement with 401 on misses.
//!
//! Shapes mirror the real backend: success envelopes are
//! `{"data": {...}}`, failures are `{"message": "..."}`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use password_hash::{PasswordHash, SaltString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone)]
struct StubUser {
    id: String,
    name: String,
    email: String,
    role: String,
    verified: bool,
    active: bool,
    password_hash: String,
}

impl StubUser {
    fn public_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role,
            "isVerified": self.verified,
            "isActive": self.active,
        })
    }
}

#[derive(Clone)]
pub struct StubState {
    /// email (lowercased) -> user
    users: Arc<RwLock<HashMap<String, StubUser>>>,
    /// bearer token -> email
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

fn hash_password(password: &str) -> String {
    let mut salt_bytes = [0u8; 16];
    let _ = getrandom::getrandom(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).unwrap_or_else(|_| SaltString::from_b64("c3R1YnNhbHQ").unwrap());
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .unwrap_or_default()
}

fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

fn gen_token() -> String {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

fn seed_users() -> HashMap<String, StubUser> {
    let mut users = HashMap::new();
    let seeds: [(&str, &str, &str, &str, bool); 5] = [
        ("u-1001", "Ada Admin", "admin@minierp.dev", "admin", true),
        ("u-1002", "Mori Manager", "manager@minierp.dev", "manager", true),
        ("u-1003", "Sam Staff", "staff@minierp.dev", "staff", true),
        ("u-1004", "Cleo Customer", "customer@minierp.dev", "customer", true),
        ("u-1005", "Pat Pending", "unverified@minierp.dev", "staff", false),
    ];
    for (id, name, email, role, verified) in seeds {
        // Seed passwords are "<role>123"
        let password = format!("{role}123");
        users.insert(
            email.to_string(),
            StubUser {
                id: id.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                role: role.to_string(),
                verified,
                active: true,
                password_hash: hash_password(&password),
            },
        );
    }
    users
}

impl StubState {
    pub fn seeded() -> Self {
        Self {
            users: Arc::new(RwLock::new(seed_users())),
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// The stub application, nested under /api like the real backend.
pub fn router() -> Router {
    router_with_state(StubState::seeded())
}

pub fn router_with_state(state: StubState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/orders", get(orders))
        .with_state(state);
    Router::new().nest("/api", api)
}

pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("API stub listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router()).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

async fn login(State(state): State<StubState>, Json(payload): Json<LoginPayload>) -> impl IntoResponse {
    let email = payload.email.trim().to_lowercase();
    let user = { state.users.read().await.get(&email).cloned() };
    let Some(user) = user else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid credentials"})));
    };
    if !verify_password(&user.password_hash, &payload.password) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid credentials"})));
    }
    if !user.verified {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"message": "Please verify your email before logging in"})),
        );
    }
    let token = gen_token();
    state.tokens.write().await.insert(token.clone(), email);
    (
        StatusCode::OK,
        Json(json!({"data": {"user": user.public_json(), "token": token}})),
    )
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    name: String,
    email: String,
    password: String,
    role: Option<String>,
}

async fn register(State(state): State<StubState>, Json(payload): Json<RegisterPayload>) -> impl IntoResponse {
    let email = payload.email.trim().to_lowercase();
    let role = payload.role.unwrap_or_else(|| "customer".to_string());
    if !["admin", "manager", "staff", "customer"].contains(&role.as_str()) {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "Unknown role"})));
    }
    let mut users = state.users.write().await;
    if users.contains_key(&email) {
        return (StatusCode::CONFLICT, Json(json!({"message": "Email already registered"})));
    }
    let user = StubUser {
        id: format!("u-{}", 2000 + users.len()),
        name: payload.name.trim().to_string(),
        email: email.clone(),
        role,
        // Accounts are born verified here; the real backend sends mail
        verified: true,
        active: true,
        password_hash: hash_password(&payload.password),
    };
    users.insert(email.clone(), user.clone());
    drop(users);
    let token = gen_token();
    state.tokens.write().await.insert(token.clone(), email);
    (
        StatusCode::CREATED,
        Json(json!({"data": {"user": user.public_json(), "token": token}})),
    )
}

async fn bearer_user(state: &StubState, headers: &HeaderMap) -> Option<StubUser> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?;
    let email = { state.tokens.read().await.get(token).cloned() }?;
    state.users.read().await.get(&email).cloned()
}

async fn me(State(state): State<StubState>, headers: HeaderMap) -> impl IntoResponse {
    match bearer_user(&state, &headers).await {
        Some(user) => (StatusCode::OK, Json(json!({"data": {"user": user.public_json()}}))),
        None => (StatusCode::UNAUTHORIZED, Json(json!({"message": "Not authorized"}))),
    }
}

async fn orders(State(state): State<StubState>, headers: HeaderMap) -> impl IntoResponse {
    match bearer_user(&state, &headers).await {
        Some(_) => (
            StatusCode::OK,
            Json(json!({"data": {"orders": [
                {"id": "o-1", "status": "pending", "total": 129.90},
                {"id": "o-2", "status": "shipped", "total": 42.00},
            ]}})),
        ),
        None => (StatusCode::UNAUTHORIZED, Json(json!({"message": "Not authorized"}))),
    }
}

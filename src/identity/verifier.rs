//! Credential verification against the backend auth endpoints. Normalizes
//! every outcome into an identity + bearer credential or a typed failure;
//! nothing here retries, and nothing here touches the session store.

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::principal::Identity;
use super::role::Role;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email/password pair. Shown inline, user may resubmit.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// Account exists but the email is unverified. The message carries the
    /// backend's verification hint for the distinct user-facing prompt.
    #[error("{0}")]
    UnverifiedAccount(String),
    /// Transport or backend failure; the user may retry manually.
    #[error("authentication service unavailable: {0}")]
    NetworkOrServer(String),
}

/// Successful verification: the identity payload plus the opaque bearer
/// credential. Both are required; the backend omitting either is a failure.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    pub identity: Identity,
    pub credential: String,
}

// Backend wire shapes. The user object tolerates both `id` and Mongo-style
// `_id`, and camelCase flag names.
#[derive(Debug, Deserialize)]
struct BackendUser {
    #[serde(alias = "_id")]
    id: String,
    name: String,
    email: String,
    role: Role,
    #[serde(rename = "isVerified", alias = "verified", default)]
    verified: bool,
    #[serde(rename = "isActive", alias = "active", default)]
    active: bool,
}

impl From<BackendUser> for Identity {
    fn from(u: BackendUser) -> Self {
        Identity { id: u.id, name: u.name, email: u.email, role: u.role, verified: u.verified, active: u.active }
    }
}

#[derive(Debug, Deserialize, Default)]
struct AuthEnvelope {
    #[serde(default)]
    data: Option<AuthData>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    #[serde(default)]
    user: Option<BackendUser>,
    #[serde(default)]
    token: Option<String>,
}

pub struct CredentialVerifier {
    http: reqwest::Client,
    base: Url,
}

impl CredentialVerifier {
    pub fn new(api_url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(api_url)?;
        Ok(Self { http: reqwest::Client::new(), base })
    }

    pub fn with_client(http: reqwest::Client, api_url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(api_url)?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        // Base URLs are configured with a path segment (".../api"), so join
        // relative to a trailing slash to keep it.
        let base = if self.base.path().ends_with('/') {
            self.base.clone()
        } else {
            match Url::parse(&format!("{}/", self.base)) {
                Ok(u) => u,
                Err(e) => return Err(AuthError::NetworkOrServer(e.to_string())),
            }
        };
        base.join(path).map_err(|e| AuthError::NetworkOrServer(e.to_string()))
    }

    /// `authenticate(email, password)`: one login attempt, no retries.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<VerifiedLogin, AuthError> {
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        let url = self.endpoint("auth/login")?;
        debug!(%email, "auth.login attempt");
        let resp = self
            .http
            .post(url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::NetworkOrServer(e.to_string()))?;
        Self::normalize(resp).await
    }

    /// Register a new account; the backend logs it in atomically and
    /// returns the same envelope as login.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<VerifiedLogin, AuthError> {
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        let url = self.endpoint("auth/register")?;
        let mut body = serde_json::json!({ "name": name, "email": email, "password": password });
        if let Some(r) = role {
            body["role"] = serde_json::json!(r.as_str());
        }
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::NetworkOrServer(e.to_string()))?;
        Self::normalize(resp).await
    }

    /// Fetch the current identity for the given bearer credential.
    pub async fn me(&self, credential: &str) -> Result<Identity, AuthError> {
        let url = self.endpoint("auth/me")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| AuthError::NetworkOrServer(e.to_string()))?;
        let status = resp.status();
        let env: AuthEnvelope = resp.json().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Self::classify_failure(status, env.message));
        }
        match env.data.and_then(|d| d.user) {
            Some(user) => Ok(user.into()),
            None => Err(AuthError::NetworkOrServer("malformed auth response".into())),
        }
    }

    async fn normalize(resp: reqwest::Response) -> Result<VerifiedLogin, AuthError> {
        let status = resp.status();
        let env: AuthEnvelope = resp.json().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Self::classify_failure(status, env.message));
        }
        let Some(data) = env.data else {
            return Err(AuthError::NetworkOrServer("malformed login response".into()));
        };
        match (data.user, data.token) {
            (Some(user), Some(token)) if !token.is_empty() => {
                Ok(VerifiedLogin { identity: user.into(), credential: token })
            }
            // Both identity and credential are required
            _ => Err(AuthError::NetworkOrServer("malformed login response".into())),
        }
    }

    fn classify_failure(status: StatusCode, message: Option<String>) -> AuthError {
        let message = message.unwrap_or_default();
        // The backend signals unverified accounts only through its message
        // text; case-insensitive substring check per its API contract.
        if message.to_lowercase().contains("verify") {
            return AuthError::UnverifiedAccount(message);
        }
        if status.is_client_error() {
            return AuthError::InvalidCredentials;
        }
        AuthError::NetworkOrServer(format!("HTTP {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_verify_hint_case_insensitive() {
        let e = CredentialVerifier::classify_failure(
            StatusCode::FORBIDDEN,
            Some("Please Verify your email before logging in".into()),
        );
        assert!(matches!(e, AuthError::UnverifiedAccount(m) if m.contains("Verify")));
    }

    #[test]
    fn classify_client_error_is_invalid_credentials() {
        let e = CredentialVerifier::classify_failure(StatusCode::UNAUTHORIZED, Some("Invalid credentials".into()));
        assert!(matches!(e, AuthError::InvalidCredentials));
    }

    #[test]
    fn classify_server_error_is_network() {
        let e = CredentialVerifier::classify_failure(StatusCode::BAD_GATEWAY, None);
        assert!(matches!(e, AuthError::NetworkOrServer(_)));
    }

    #[test]
    fn backend_user_accepts_mongo_id_and_camel_case_flags() {
        let u: BackendUser = serde_json::from_str(
            r#"{"_id":"65af","name":"Pat","email":"pat@x.dev","role":"customer","isVerified":true,"isActive":false}"#,
        )
        .unwrap();
        let id: Identity = u.into();
        assert_eq!(id.id, "65af");
        assert_eq!(id.role, Role::Customer);
        assert!(id.verified);
        assert!(!id.active);
    }
}

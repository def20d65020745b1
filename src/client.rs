//! Bearer-authenticated HTTP client for the ERP backend. Every request
//! reads the session store for the credential; any 401 response destroys
//! the session and forces navigation to the login path, independent of the
//! route guard.

use std::sync::Arc;

use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::identity::SessionStore;
use crate::routes::{Navigator, LOGIN_PATH};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    store: SessionStore,
    nav: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(api_url: &str, store: SessionStore, nav: Arc<dyn Navigator>) -> anyhow::Result<Self> {
        Self::with_client(reqwest::Client::new(), api_url, store, nav)
    }

    pub fn with_client(
        http: reqwest::Client,
        api_url: &str,
        store: SessionStore,
        nav: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(api_url)?;
        Ok(Self { http, base, store, nav })
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn get(&self, path: &str) -> AppResult<Value> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> AppResult<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> AppResult<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> AppResult<Value> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> AppResult<Value> {
        self.request(Method::DELETE, path, None).await
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> AppResult<Value> {
        let url = self
            .endpoint(path)
            .map_err(|e| AppError::user("bad_path", e.as_str()))?;
        let mut req = self.http.request(method.clone(), url);
        // Attach the bearer credential when a session is live; without one
        // the request goes out unauthenticated and the backend answers 401.
        if let Some(session) = self.store.read() {
            req = req.bearer_auth(&session.credential);
        }
        if let Some(b) = &body {
            req = req.json(b);
        }
        debug!(target: "api", %method, path, "backend request");
        let resp = req
            .send()
            .await
            .map_err(|e| {
                let detail = e.to_string();
                AppError::network("backend_unreachable", detail.as_str())
            })?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            // Session considered invalid mid-flight: silent cleanup, hard
            // redirect from wherever the call originated.
            warn!(target: "api", path, "401 from backend, invalidating session");
            self.store.destroy();
            self.nav.redirect(LOGIN_PATH);
            return Err(AppError::auth("unauthorized", "session is no longer valid"));
        }

        let val: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = val
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("backend request failed")
                .to_string();
            return Err(AppError::from_upstream_status(status.as_u16(), message));
        }
        Ok(val)
    }

    fn endpoint(&self, path: &str) -> Result<Url, String> {
        let base = if self.base.path().ends_with('/') {
            self.base.clone()
        } else {
            Url::parse(&format!("{}/", self.base)).map_err(|e| e.to_string())?
        };
        base.join(path.trim_start_matches('/')).map_err(|e| e.to_string())
    }
}

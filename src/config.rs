//! Startup configuration, collected from environment variables with defaults.

use std::time::Duration;

use base64::Engine;

use crate::identity::claims::SESSION_KEY_LEN;
use crate::inactivity::DEFAULT_IDLE_WINDOW;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the console shell listens on.
    pub http_port: u16,
    /// Base URL of the ERP REST backend.
    pub api_url: String,
    /// Idle window before a session is force-expired.
    pub idle_timeout: Duration,
    /// HMAC key for session claim signing.
    pub session_key: [u8; SESSION_KEY_LEN],
}

impl Config {
    pub fn from_env() -> Self {
        let http_port = std::env::var("MINIERP_HTTP_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(7878);
        let api_url = std::env::var("MINIERP_API_URL")
            .unwrap_or_else(|_| "http://localhost:5000/api".to_string());
        let idle_secs = std::env::var("MINIERP_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_IDLE_WINDOW.as_secs());
        Self {
            http_port,
            api_url,
            idle_timeout: Duration::from_secs(idle_secs),
            session_key: load_session_key(),
        }
    }
}

/// Read the signing key from MINIERP_SESSION_KEY (base64, 32 bytes).
/// Falls back to a process-local random key: sessions then die with the
/// process, which is acceptable for development but not for multi-instance
/// deployments.
fn load_session_key() -> [u8; SESSION_KEY_LEN] {
    if let Ok(s) = std::env::var("MINIERP_SESSION_KEY") {
        match base64::engine::general_purpose::STANDARD.decode(s.trim()) {
            Ok(bytes) if bytes.len() == SESSION_KEY_LEN => {
                let mut key = [0u8; SESSION_KEY_LEN];
                key.copy_from_slice(&bytes);
                return key;
            }
            _ => {
                tracing::warn!("MINIERP_SESSION_KEY is not {} base64 bytes; generating an ephemeral key", SESSION_KEY_LEN);
            }
        }
    } else {
        tracing::warn!("MINIERP_SESSION_KEY unset; generating an ephemeral key, sessions will not survive restarts");
    }
    let mut key = [0u8; SESSION_KEY_LEN];
    let _ = getrandom::getrandom(&mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        // Not set in the test environment
        let cfg = Config::from_env();
        assert_eq!(cfg.api_url, "http://localhost:5000/api");
        assert_eq!(cfg.idle_timeout, Duration::from_secs(300));
    }
}

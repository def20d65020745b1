//! Signed session claims. The token is opaque to its holder: serde_json
//! claims, HMAC-SHA256 over the payload, both parts base64url encoded and
//! joined with a dot. Any tampering (including a role edit) breaks the MAC
//! and the token reads as "no session".

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::principal::Identity;
use super::role::Role;

/// HMAC key length in bytes.
pub const SESSION_KEY_LEN: usize = 32;

/// The claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub active: bool,
    /// Opaque bearer credential for backend calls.
    pub credential: String,
    /// UTC epoch milliseconds at issue time.
    pub issued_at: i64,
}

impl SessionClaims {
    pub fn new(identity: &Identity, credential: &str) -> Self {
        Self {
            id: identity.id.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
            verified: identity.verified,
            active: identity.active,
            credential: credential.to_string(),
            issued_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            verified: self.verified,
            active: self.active,
        }
    }
}

/// Signs and verifies session tokens. The key never leaves this struct;
/// holders of a token can read the claims but not mint or alter them.
#[derive(Clone)]
pub struct SessionCodec {
    key: [u8; SESSION_KEY_LEN],
}

impl SessionCodec {
    pub fn new(key: [u8; SESSION_KEY_LEN]) -> Self {
        Self { key }
    }

    /// Fresh random-key codec for tests and single-process development.
    pub fn ephemeral() -> Self {
        let mut key = [0u8; SESSION_KEY_LEN];
        let _ = getrandom::getrandom(&mut key);
        Self { key }
    }

    pub fn encode(&self, claims: &SessionClaims) -> String {
        let payload = serde_json::to_vec(claims).unwrap_or_default();
        let Ok(mut mac) = <Hmac<Sha256>>::new_from_slice(&self.key) else {
            return String::new();
        };
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();
        format!("{}.{}", URL_SAFE_NO_PAD.encode(&payload), URL_SAFE_NO_PAD.encode(tag))
    }

    /// Decode and verify a token. Every failure mode (bad structure, bad
    /// base64, MAC mismatch, unknown role) yields None, never an error.
    pub fn decode(&self, token: &str) -> Option<SessionClaims> {
        let (payload_b64, tag_b64) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let tag = URL_SAFE_NO_PAD.decode(tag_b64).ok()?;
        let mut mac = <Hmac<Sha256>>::new_from_slice(&self.key).ok()?;
        mac.update(&payload);
        mac.verify_slice(&tag).ok()?;
        serde_json::from_slice(&payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> SessionClaims {
        let identity = Identity {
            id: "u-1".into(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            role: Role::Staff,
            verified: true,
            active: true,
        };
        SessionClaims::new(&identity, "bearer-token-1")
    }

    #[test]
    fn round_trip() {
        let codec = SessionCodec::ephemeral();
        let c = claims();
        let token = codec.encode(&c);
        let back = codec.decode(&token).expect("token should verify");
        assert_eq!(back, c);
    }

    #[test]
    fn forged_role_upgrade_is_rejected() {
        let codec = SessionCodec::ephemeral();
        let token = codec.encode(&claims());
        // Re-encode the payload with role swapped to admin, keeping the old tag
        let (payload_b64, tag_b64) = token.split_once('.').unwrap();
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        let forged = String::from_utf8(payload).unwrap().replace("\"staff\"", "\"admin\"");
        let forged_token = format!("{}.{}", URL_SAFE_NO_PAD.encode(forged.as_bytes()), tag_b64);
        assert!(codec.decode(&forged_token).is_none());
    }

    #[test]
    fn truncated_and_garbage_tokens_are_rejected() {
        let codec = SessionCodec::ephemeral();
        let token = codec.encode(&claims());
        assert!(codec.decode(&token[..token.len() / 2]).is_none());
        assert!(codec.decode("").is_none());
        assert!(codec.decode("not-a-token").is_none());
        assert!(codec.decode("a.b.c").is_none());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token = SessionCodec::ephemeral().encode(&claims());
        assert!(SessionCodec::ephemeral().decode(&token).is_none());
    }

    #[test]
    fn unknown_role_fails_decode() {
        let codec = SessionCodec::new([7u8; SESSION_KEY_LEN]);
        // Sign a payload whose role is outside the known set with the real key
        let raw = br#"{"id":"u-1","name":"A","email":"a@x","role":"root","verified":true,"active":true,"credential":"t","issued_at":0}"#;
        let mut mac = <Hmac<Sha256>>::new_from_slice(&[7u8; SESSION_KEY_LEN]).unwrap();
        mac.update(raw);
        let tag = mac.finalize().into_bytes();
        let token = format!("{}.{}", URL_SAFE_NO_PAD.encode(raw), URL_SAFE_NO_PAD.encode(tag));
        assert!(codec.decode(&token).is_none());
    }
}

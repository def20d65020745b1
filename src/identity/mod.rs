//! Identity, session and credential handling for the console shell.
//! Keep the public surface thin and split implementation across sub-modules.

pub mod claims;
mod principal;
mod role;
mod session;
mod verifier;

pub use claims::{SessionClaims, SessionCodec};
pub use principal::Identity;
pub use role::Role;
pub use session::{MemoryBackend, Session, SessionBackend, SessionStatus, SessionStore};
pub use verifier::{AuthError, CredentialVerifier, VerifiedLogin};

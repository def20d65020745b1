use serde::{Deserialize, Serialize};

use super::role::Role;

/// The authenticated user's profile as issued by the backend on login.
/// Read-only to this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub active: bool,
}
